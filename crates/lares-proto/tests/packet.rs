//! End-to-end wire scenarios for the packet codec.
//!
//! These tests pin down literal byte layouts and the cross-module
//! behaviors: compression across records, extraction rules, OPT placement
//! and reply matching.

use lares_proto::{
    AnswerFlags, Error, Packet, Protocol, RData, RecordType, ResourceKey, ResourceRecord,
    HEADER_SIZE,
};

fn a_key(name: &str) -> ResourceKey {
    ResourceKey::new(name, RecordType::A.to_u16())
}

#[test]
fn a_record_query_layout() {
    let mut p = Packet::new_query(Protocol::Dns, 1500, false);
    p.append_key(&a_key("example.com.")).unwrap();
    p.set_qdcount(1);

    assert_eq!(p.len(), 29);
    // QR=0, OPCODE=0, RD=1.
    assert_eq!(&p.data()[2..4], &[0x01, 0x00]);
    assert_eq!(&p.data()[12..25], b"\x07example\x03com\x00");
    // Type A, class IN.
    assert_eq!(&p.data()[25..29], &[0x00, 0x01, 0x00, 0x01]);
}

#[test]
fn ns_records_share_compressed_names() {
    let mut p = Packet::new(Protocol::Dns, 1500);

    for target in ["ns1.example.com.", "ns2.example.com."] {
        let rr = ResourceRecord::new(
            ResourceKey::new("example.com.", RecordType::NS.to_u16()),
            3600,
            RData::Ns(target.into()),
        );
        p.append_rr(&rr).unwrap();
    }
    p.set_ancount(2);

    // First record: full owner name at 12, rdata of a 4-byte label plus a
    // pointer back to the owner.
    assert_eq!(&p.data()[33..35], &[0x00, 0x06]); // rdlength
    assert_eq!(&p.data()[35..41], &[3, b'n', b's', b'1', 0xC0, 12]);

    // Second record: the owner itself is a pointer to offset 12.
    assert_eq!(&p.data()[41..43], &[0xC0, 12]);
    assert_eq!(&p.data()[53..59], &[3, b'n', b's', b'2', 0xC0, 12]);

    // Both parse back to full names.
    let mut q = Packet::from_wire(Protocol::Dns, p.data()).unwrap();
    q.extract().unwrap();
    let answer = q.answer().unwrap();
    assert_eq!(answer.len(), 2);
    assert_eq!(
        answer.records().map(|rr| rr.rdata.to_string()).collect::<Vec<_>>(),
        vec!["ns1.example.com.", "ns2.example.com."]
    );
}

#[test]
fn self_referencing_pointer_is_rejected() {
    let mut data = vec![0u8; HEADER_SIZE];
    data.extend_from_slice(&[0xC0, 0x0C]);

    let mut p = Packet::from_wire(Protocol::Dns, &data).unwrap();
    assert!(matches!(
        p.read_name(true),
        Err(Error::BadPointer { target: 12, .. })
    ));
    assert_eq!(p.rindex(), HEADER_SIZE);
}

#[test]
fn mdns_cache_flush_bit() {
    // An A record whose class carries the cache-flush bit.
    let mut data = vec![0u8; HEADER_SIZE];
    data[7] = 1; // ancount
    data.extend_from_slice(b"\x03foo\x05local\x00");
    data.extend_from_slice(&[0x00, 0x01, 0x80, 0x01]);
    data.extend_from_slice(&[0, 0, 0, 120]);
    data.extend_from_slice(&[0x00, 0x04, 192, 0, 2, 1]);

    let mut p = Packet::from_wire(Protocol::Mdns, &data).unwrap();
    let (rr, cache_flush) = p.read_rr().unwrap();
    assert!(cache_flush);
    assert_eq!(rr.key.class, 1);

    // With the flush bit the record set is uniquely owned.
    let mut p = Packet::from_wire(Protocol::Mdns, &data).unwrap();
    p.extract().unwrap();
    let item = &p.answer().unwrap().items()[0];
    assert!(item.flags.contains(AnswerFlags::CACHEABLE));
    assert!(!item.flags.contains(AnswerFlags::SHARED_OWNER));

    // The same bytes in the question section are malformed.
    let mut data = vec![0u8; HEADER_SIZE];
    data[5] = 1; // qdcount
    data.extend_from_slice(b"\x03foo\x05local\x00");
    data.extend_from_slice(&[0x00, 0x01, 0x80, 0x01]);

    let mut p = Packet::from_wire(Protocol::Mdns, &data).unwrap();
    assert!(matches!(p.extract(), Err(Error::Malformed { .. })));
    assert!(p.question().is_none());
}

#[test]
fn mdns_shared_owner_flag() {
    let mut p = Packet::new(Protocol::Mdns, 1500);
    p.set_ifindex(7);

    let flush = ResourceRecord::new(
        ResourceKey::with_class("unique.local.", RecordType::A.to_u16(), 0x8001),
        120,
        RData::A([192, 0, 2, 1].into()),
    );
    let shared = ResourceRecord::new(
        ResourceKey::with_class("shared.local.", RecordType::A.to_u16(), 1),
        120,
        RData::A([192, 0, 2, 2].into()),
    );
    p.append_rr(&flush).unwrap();
    p.append_rr(&shared).unwrap();
    p.set_ancount(2);

    let mut q = Packet::from_wire(Protocol::Mdns, p.data()).unwrap();
    q.set_ifindex(7);
    q.extract().unwrap();

    let items = q.answer().unwrap().items();
    assert!(!items[0].flags.contains(AnswerFlags::SHARED_OWNER));
    assert!(items[1].flags.contains(AnswerFlags::SHARED_OWNER));
    assert_eq!(items[0].ifindex, 7);
}

#[test]
fn opt_placement_rules() {
    let a_rr = ResourceRecord::new(a_key("example.com."), 3600, RData::A([192, 0, 2, 1].into()));

    // OPT in the answer section: malformed.
    let mut p = Packet::new(Protocol::Dns, 1500);
    p.append_opt_rr(4096, false).unwrap();
    p.append_rr(&a_rr).unwrap();
    p.set_ancount(1);
    p.set_arcount(1);

    let mut q = Packet::from_wire(Protocol::Dns, p.data()).unwrap();
    assert!(matches!(q.extract(), Err(Error::Malformed { .. })));

    // OPT in the additional section: accepted and filtered out of the
    // answer list.
    let mut p = Packet::new(Protocol::Dns, 1500);
    p.append_rr(&a_rr).unwrap();
    p.append_opt_rr(4096, true).unwrap();
    p.set_ancount(1);
    p.set_arcount(1);

    let mut q = Packet::from_wire(Protocol::Dns, p.data()).unwrap();
    q.extract().unwrap();
    assert_eq!(q.answer().unwrap().len(), 1);
    assert_eq!(q.edns_max_udp_size(), Some(4096));
    assert!(q.edns_do());

    // A second OPT is one too many.
    let mut p = Packet::new(Protocol::Dns, 1500);
    p.append_rr(&a_rr).unwrap();
    p.append_opt_rr(4096, false).unwrap();
    p.append_opt_rr(4096, false).unwrap();
    p.set_ancount(1);
    p.set_arcount(2);

    let mut q = Packet::from_wire(Protocol::Dns, p.data()).unwrap();
    assert!(q.extract().is_err());
}

#[test]
fn opt_with_non_root_owner_is_rejected() {
    let mut p = Packet::new(Protocol::Dns, 1500);
    let rr = ResourceRecord::new(
        ResourceKey::with_class("example.com.", RecordType::OPT.to_u16(), 4096),
        0,
        RData::Generic(Vec::new()),
    );
    p.append_rr(&rr).unwrap();
    p.set_arcount(1);

    let mut q = Packet::from_wire(Protocol::Dns, p.data()).unwrap();
    assert!(q.extract().is_err());
}

#[test]
fn loc_with_unknown_version_survives_reserialization() {
    let mut data = vec![0u8; HEADER_SIZE];
    data[7] = 1; // ancount
    data.extend_from_slice(b"\x03gps\x00");
    data.extend_from_slice(&[0x00, 0x1D, 0x00, 0x01]);
    data.extend_from_slice(&[0, 0, 0, 60]);
    data.extend_from_slice(&[0x00, 0x06, 1, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE]);

    let mut p = Packet::from_wire(Protocol::Dns, &data).unwrap();
    p.extract().unwrap();

    let rr = &p.answer().unwrap().items()[0].rr;
    assert!(rr.unparseable);

    let mut out = Packet::new(Protocol::Dns, 1500);
    let (_, rdata_start) = out.append_rr(rr).unwrap();
    assert_eq!(&out.data()[rdata_start..], &[1, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE]);
}

#[test]
fn extract_is_idempotent() {
    let mut p = Packet::new(Protocol::Dns, 1500);
    p.append_key(&a_key("example.com.")).unwrap();
    p.set_qdcount(1);

    let mut q = Packet::from_wire(Protocol::Dns, p.data()).unwrap();
    let cursor = q.rindex();
    q.extract().unwrap();
    assert_eq!(q.rindex(), cursor);

    let question = q.question().unwrap().clone();
    q.extract().unwrap();
    assert_eq!(q.question().unwrap(), &question);
}

#[test]
fn extract_rejects_bad_question_types() {
    let mut p = Packet::new(Protocol::Dns, 1500);
    p.append_key(&ResourceKey::new("example.com.", RecordType::OPT.to_u16()))
        .unwrap();
    p.set_qdcount(1);

    let mut q = Packet::from_wire(Protocol::Dns, p.data()).unwrap();
    assert!(matches!(q.extract(), Err(Error::Malformed { .. })));
}

#[test]
fn extract_restores_cursor_on_failure() {
    // qdcount says one question but the section is empty.
    let mut data = vec![0u8; HEADER_SIZE];
    data[5] = 1;

    let mut p = Packet::from_wire(Protocol::Dns, &data).unwrap();
    let cursor = p.rindex();
    assert!(matches!(p.extract(), Err(Error::Truncated { .. })));
    assert_eq!(p.rindex(), cursor);
    assert!(p.question().is_none());
    assert!(p.answer().is_none());
}

#[test]
fn authority_and_additional_are_not_cacheable() {
    let a_rr = ResourceRecord::new(a_key("example.com."), 3600, RData::A([192, 0, 2, 1].into()));
    let ns_rr = ResourceRecord::new(
        ResourceKey::new("example.com.", RecordType::NS.to_u16()),
        3600,
        RData::Ns("ns1.example.com.".into()),
    );

    let mut p = Packet::new(Protocol::Dns, 1500);
    p.append_rr(&a_rr).unwrap();
    p.append_rr(&ns_rr).unwrap();
    p.set_ancount(1);
    p.set_nscount(1);

    let mut q = Packet::from_wire(Protocol::Dns, p.data()).unwrap();
    q.extract().unwrap();

    let items = q.answer().unwrap().items();
    assert!(items[0].flags.contains(AnswerFlags::CACHEABLE));
    assert!(!items[1].flags.contains(AnswerFlags::CACHEABLE));
}

#[test]
fn reply_matching() {
    let key = a_key("example.com.");

    let mut p = Packet::new_query(Protocol::Dns, 1500, false);
    p.append_key(&key).unwrap();
    p.set_qdcount(1);

    // Flip QR so the bytes become a reply to that query.
    let mut bytes = p.data().to_vec();
    bytes[2] |= 0x80;

    let mut reply = Packet::from_wire(Protocol::Dns, &bytes).unwrap();
    assert!(reply.is_reply_for(&key).unwrap());
    assert!(reply.is_reply_for(&a_key("EXAMPLE.com.")).unwrap());
    assert!(!reply.is_reply_for(&a_key("other.com.")).unwrap());
    assert!(!reply
        .is_reply_for(&ResourceKey::new("example.com.", RecordType::AAAA.to_u16()))
        .unwrap());

    // A query is not a reply for anything.
    let mut query = Packet::from_wire(Protocol::Dns, p.data()).unwrap();
    assert!(!query.is_reply_for(&key).unwrap());
}

#[test]
fn appends_never_outgrow_the_limit() {
    let mut p = Packet::new(Protocol::Dns, 65_535 + 1000);
    let chunk = vec![0u8; 8_192];

    let mut total = HEADER_SIZE;
    loop {
        match p.append_blob(&chunk) {
            Ok(_) => {
                total += chunk.len();
                assert_eq!(p.len(), total);
            }
            Err(Error::MessageTooBig { .. }) => break,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert!(p.len() <= 65_535);
    assert_eq!(p.len(), total);
}

#[test]
fn structural_roundtrip_through_extract() {
    // Build a response with a question and a mixed bag of records,
    // extract it, re-serialize every record and extract again: the
    // structured values must survive both trips.
    let mut p = Packet::new(Protocol::Dns, 4096);
    p.append_key(&a_key("example.com.")).unwrap();
    p.set_qdcount(1);

    let records = vec![
        ResourceRecord::new(a_key("example.com."), 3600, RData::A([192, 0, 2, 1].into())),
        ResourceRecord::new(
            ResourceKey::new("example.com.", RecordType::TXT.to_u16()),
            300,
            RData::Txt(vec![b"v=spf1 -all".as_slice().into()]),
        ),
        ResourceRecord::new(
            ResourceKey::new("example.com.", RecordType::MX.to_u16()),
            3600,
            RData::Mx {
                priority: 10,
                exchange: "mail.example.com.".into(),
            },
        ),
    ];
    for rr in &records {
        p.append_rr(rr).unwrap();
    }
    p.set_ancount(records.len() as u16);

    let mut q = Packet::from_wire(Protocol::Dns, p.data()).unwrap();
    q.extract().unwrap();
    let first: Vec<ResourceRecord> = q.answer().unwrap().records().cloned().collect();

    let mut r = Packet::new(Protocol::Dns, 4096);
    for rr in &first {
        r.append_rr(rr).unwrap();
    }
    r.set_ancount(first.len() as u16);

    let mut s = Packet::from_wire(Protocol::Dns, r.data()).unwrap();
    s.extract().unwrap();
    let second: Vec<ResourceRecord> = s.answer().unwrap().records().cloned().collect();

    assert_eq!(first, second);
}
