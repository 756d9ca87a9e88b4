use std::{sync::Arc, thread};

use ctfcore::{
    bit_cursor::BitCursor,
    config::DecodeConfig,
    errors::{DecodeError, ReadError},
    event::{EventDeclaration, EventDefinition, decode_scope},
    layout::{ByteOrder, Encoding},
    scope::LexicalScope,
    types::{
        EnumBuilder, FloatDeclaration, IntegerDeclaration, SequenceDeclaration, StringDeclaration,
        StructBuilder, StructDeclaration, StructDefinition, VariantBuilder,
    },
};

fn packet_context() -> Arc<StructDeclaration> {
    let mut builder = StructBuilder::new(8);
    builder
        .field("cpu_id", IntegerDeclaration::uint_8().into())
        .unwrap()
        .field("name_len", IntegerDeclaration::uint_8().into())
        .unwrap();
    Arc::new(builder.build())
}

/// Header `{ id: enum, timestamp: u32 }`, payload selected by `id`.
fn event() -> Arc<EventDeclaration> {
    let mut id = EnumBuilder::new(IntegerDeclaration::uint_8());
    id.add(0, 0, "text");
    id.add(1, 1, "sample");

    let mut header = StructBuilder::new(8);
    header
        .field("id", id.build().into())
        .unwrap()
        .field("timestamp", IntegerDeclaration::uint_32be().into())
        .unwrap();

    let mut stream_context = StructBuilder::new(8);
    stream_context
        .field("tid", IntegerDeclaration::int_32le().into())
        .unwrap();

    let char8 = IntegerDeclaration::uint_8().with_encoding(Encoding::Utf8);
    let mut text = StructBuilder::new(8);
    text.field("name", SequenceDeclaration::new("name_len", char8.into()).into())
        .unwrap()
        .field("message", StringDeclaration::new(Encoding::Utf8).into())
        .unwrap();

    let mut sample = StructBuilder::new(8);
    sample
        .field("value", FloatDeclaration::binary64(ByteOrder::LittleEndian).into())
        .unwrap();

    let mut payload = VariantBuilder::new();
    payload
        .tag("stream.event.header.id")
        .field("text", text.build().into())
        .unwrap()
        .field("sample", sample.build().into())
        .unwrap();

    let mut fields = StructBuilder::new(8);
    fields.field("payload", payload.build().into()).unwrap();

    Arc::new(
        EventDeclaration::new("mixed")
            .with_header(header.build())
            .with_stream_context(stream_context.build())
            .with_fields(fields.build()),
    )
}

fn text_record(timestamp: u32, message: &str) -> Vec<u8> {
    let mut data = vec![0u8];
    data.extend_from_slice(&timestamp.to_be_bytes());
    data.extend_from_slice(&(-5i32).to_le_bytes());
    data.extend_from_slice(b"abc");
    data.extend_from_slice(message.as_bytes());
    data.push(0);
    data
}

fn sample_record(timestamp: u32, value: f64) -> Vec<u8> {
    let mut data = vec![1u8];
    data.extend_from_slice(&timestamp.to_be_bytes());
    data.extend_from_slice(&7i32.to_le_bytes());
    data.extend_from_slice(&value.to_le_bytes());
    data
}

fn decode_packet(cpu: u8, name_len: u8) -> Arc<StructDefinition> {
    let mut cursor = BitCursor::new([cpu, name_len]);
    decode_scope(
        &packet_context(),
        LexicalScope::StreamPacketContext,
        &mut cursor,
        DecodeConfig::default(),
    )
    .unwrap()
}

fn cpu_of(packet: &StructDefinition) -> Option<u32> {
    packet
        .lookup_integer("cpu_id")
        .and_then(|cpu| cpu.as_unsigned())
        .map(|cpu| cpu as u32)
}

#[test]
fn test_text_record() {
    let packet = decode_packet(2, 3);
    let declaration = event();
    let data = text_record(100, "hello");
    let mut cursor = BitCursor::new(data.as_slice());

    let event = declaration
        .decode(&mut cursor, Some(&packet), cpu_of(&packet))
        .unwrap();

    assert_eq!(event.cpu(), Some(2));
    assert_eq!(event.timestamp(), 100);
    assert_eq!(cursor.remaining_bits(), 0);

    let payload = event.fields().unwrap().lookup_variant("payload").unwrap();
    assert_eq!(payload.current_field_name(), "text");
    let text = payload.current_field().as_struct().unwrap();
    assert_eq!(text.lookup_array("name").and_then(|n| n.as_text()).as_deref(), Some("abc"));
    assert_eq!(text.lookup_string("message").map(|m| m.value()), Some("hello"));

    let context = event.context().unwrap();
    assert_eq!(context.field_names(), ["tid"]);
    assert_eq!(
        context.lookup_definition("tid").and_then(|d| d.as_integer()).map(|i| i.value()),
        Some(-5)
    );

    let rendered = event.to_string();
    assert!(rendered.starts_with("Event type: mixed\nTimestamp: 100"));
    assert!(rendered.contains(
        "Fields: { payload = { text = { name = \"abc\", message = \"hello\" } } }"
    ));
}

#[test]
fn test_sample_record() {
    let packet = decode_packet(0, 3);
    let data = sample_record(7, -1.25);
    let mut cursor = BitCursor::new(data);

    let event = event().decode(&mut cursor, Some(&packet), None).unwrap();
    let payload = event.lookup_field("payload").and_then(|p| p.as_variant()).unwrap();
    assert_eq!(payload.current_field_name(), "sample");
    assert_eq!(
        event
            .lookup_field("payload.sample.value")
            .and_then(|v| v.as_float())
            .map(|v| v.value()),
        Some(-1.25)
    );
}

#[test]
fn test_sequence_of_fifteen() {
    let packet = decode_packet(0, 15);
    let declaration = event();

    let mut data = vec![0u8];
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(&0i32.to_le_bytes());
    data.extend((0..15).map(|i| b'a' + i));
    data.push(0);

    let mut cursor = BitCursor::new(data);
    let event = declaration.decode(&mut cursor, Some(&packet), None).unwrap();
    let name = event
        .lookup_field("payload.text.name")
        .and_then(|n| n.as_array())
        .unwrap();
    assert_eq!(name.len(), 15);
    assert_eq!(name.as_text().as_deref(), Some("abcdefghijklmno"));
}

#[test]
fn test_sequence_limit_from_config() {
    let packet = decode_packet(0, 3);
    let data = text_record(1, "x");
    let mut cursor = BitCursor::new(data);

    let config = DecodeConfig::default().with_max_sequence_length(2);
    let err = event()
        .decode_with_config(&mut cursor, Some(&packet), None, config)
        .unwrap_err();
    assert_eq!(
        err,
        DecodeError::InvalidLength {
            name: "name_len".to_string(),
            length: 3
        }
    );
}

#[test]
fn test_record_stream_with_truncated_tail() {
    let packet = decode_packet(1, 3);
    let declaration = event();

    let mut stream = Vec::new();
    stream.extend(text_record(10, "first"));
    stream.extend(sample_record(20, 2.5));
    stream.extend(text_record(30, "third"));
    let truncated = sample_record(40, 4.0);
    stream.extend_from_slice(&truncated[..truncated.len() - 3]);

    let mut cursor = BitCursor::new(stream.as_slice());
    let mut events: Vec<EventDefinition> = Vec::new();
    let err = loop {
        match declaration.decode(&mut cursor, Some(&packet), cpu_of(&packet)) {
            Ok(event) => events.push(event),
            Err(err) => break err,
        }
    };

    assert_eq!(err, DecodeError::Read(ReadError::OutOfBounds));
    let timestamps: Vec<i64> = events.iter().map(|e| e.timestamp()).collect();
    assert_eq!(timestamps, [10, 20, 30]);
    assert_eq!(
        events[2]
            .lookup_field("payload.text.message")
            .map(|m| m.to_string())
            .as_deref(),
        Some("\"third\"")
    );

    // The declaration is still usable after the failure.
    let data = sample_record(50, 1.0);
    let event = declaration
        .decode(&mut BitCursor::new(data), Some(&packet), None)
        .unwrap();
    assert_eq!(event.timestamp(), 50);
}

#[test]
fn test_concurrent_decodes_share_declarations() {
    let declaration = event();
    let packet = decode_packet(3, 3);

    thread::scope(|s| {
        let handles: Vec<_> = (0..8u32)
            .map(|worker| {
                let declaration = &declaration;
                let packet = &packet;
                s.spawn(move || {
                    let mut timestamps = Vec::new();
                    for i in 0..50u32 {
                        let timestamp = worker * 1000 + i;
                        let data = if i % 2 == 0 {
                            text_record(timestamp, "msg")
                        } else {
                            sample_record(timestamp, f64::from(i))
                        };
                        let event = declaration
                            .decode(&mut BitCursor::new(data), Some(packet), cpu_of(packet))
                            .unwrap();
                        timestamps.push(event.timestamp());
                    }
                    timestamps
                })
            })
            .collect();

        for (worker, handle) in handles.into_iter().enumerate() {
            let timestamps = handle.join().unwrap();
            let expected: Vec<i64> = (0..50).map(|i| worker as i64 * 1000 + i).collect();
            assert_eq!(timestamps, expected);
        }
    });
}
