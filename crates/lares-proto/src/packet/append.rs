//! The append side of the packet: primitives, names with compression,
//! keys, resource records and the OPT pseudo-record.
//!
//! Every compound append snapshots the packet size on entry and truncates
//! back to it on any failure, dropping dictionary entries that pointed into
//! the discarded region. The read-side counterparts of the per-type RDATA
//! serializers live in `read.rs`; keep the two dispatch tables in step when
//! adding a type.

use super::Packet;
use crate::bitmap::TypeBitmap;
use crate::error::{Error, Result};
use crate::name::{self, apply_idna, undo_idna, unescape_label};
use crate::question::ResourceKey;
use crate::rdata::RData;
use crate::record::ResourceRecord;
use crate::rtype::RecordType;
use crate::{
    Protocol, COMPRESSION_OFFSET_MAX, MAX_LABEL_LENGTH, MAX_NAME_LENGTH, UNICAST_PACKET_SIZE_MAX,
};
use smallvec::SmallVec;

/// DNSSEC OK bit in the OPT flags field (RFC 3225).
pub(crate) const EDNS0_OPT_DO: u16 = 1 << 15;

impl Packet {
    /// Appends raw bytes, returning their starting offset.
    pub fn append_blob(&mut self, data: &[u8]) -> Result<usize> {
        let start = self.extend(data.len())?;
        self.buf[start..start + data.len()].copy_from_slice(data);
        Ok(start)
    }

    /// Appends one byte.
    pub fn append_u8(&mut self, value: u8) -> Result<usize> {
        let start = self.extend(1)?;
        self.buf[start] = value;
        Ok(start)
    }

    /// Appends a big-endian u16.
    pub fn append_u16(&mut self, value: u16) -> Result<usize> {
        let start = self.extend(2)?;
        self.buf[start..start + 2].copy_from_slice(&value.to_be_bytes());
        Ok(start)
    }

    /// Appends a big-endian u32.
    pub fn append_u32(&mut self, value: u32) -> Result<usize> {
        let start = self.extend(4)?;
        self.buf[start..start + 4].copy_from_slice(&value.to_be_bytes());
        Ok(start)
    }

    /// Appends a length-prefixed character string (RFC 1035 §3.3).
    pub fn append_string(&mut self, s: &str) -> Result<usize> {
        self.append_raw_string(s.as_bytes())
    }

    /// Appends a length-prefixed byte string of up to 255 bytes.
    pub fn append_raw_string(&mut self, data: &[u8]) -> Result<usize> {
        if data.len() > 255 {
            return Err(Error::malformed(self.len(), "string longer than 255 bytes"));
        }

        let start = self.extend(1 + data.len())?;
        let dst = &mut self.buf[start..start + 1 + data.len()];
        dst[0] = data.len() as u8;
        dst[1..].copy_from_slice(data);
        Ok(start)
    }

    /// Appends one label: a length byte followed by the label bytes.
    ///
    /// When the packet is in DNSSEC canonical form and this label is a
    /// candidate, ASCII uppercase is folded as the bytes are written
    /// (RFC 4034 §6.2). Otherwise the bytes go out verbatim; DNS-SD relies
    /// on label case surviving.
    pub fn append_label(&mut self, label: &[u8], canonical_candidate: bool) -> Result<usize> {
        if label.len() > MAX_LABEL_LENGTH {
            return Err(Error::LabelTooLong {
                length: label.len(),
            });
        }

        let start = self.extend(1 + label.len())?;
        let dst = &mut self.buf[start..start + 1 + label.len()];
        dst[0] = label.len() as u8;
        dst[1..].copy_from_slice(label);

        if self.canonical_form && canonical_candidate {
            dst[1..].make_ascii_lowercase();
        }

        Ok(start)
    }

    /// Appends a domain name in escaped text form, returning its starting
    /// offset.
    ///
    /// With compression allowed, a suffix already present in the packet is
    /// replaced by a 2-byte pointer to its first occurrence, and every
    /// newly written suffix is recorded for later appends. The IDNA
    /// direction follows the protocol: classic DNS gets A-labels, mDNS and
    /// LLMNR carry UTF-8 and get ACE labels decoded.
    pub fn append_name(
        &mut self,
        name: &str,
        allow_compression: bool,
        canonical_candidate: bool,
    ) -> Result<usize> {
        let allow_compression = allow_compression && !self.refuse_compression;

        let saved_size = self.len();
        match self.append_name_inner(name, allow_compression, canonical_candidate) {
            Ok(()) => Ok(saved_size),
            Err(e) => {
                self.truncate(saved_size);
                Err(e)
            }
        }
    }

    fn append_name_inner(
        &mut self,
        name: &str,
        allow_compression: bool,
        canonical_candidate: bool,
    ) -> Result<()> {
        let mut rest = name;
        let mut label = [0u8; MAX_LABEL_LENGTH + 1];
        let mut wire_len = 0usize;

        while !rest.is_empty() && rest != "." {
            let dict_key = if allow_compression {
                let key = name::canonical(rest)?;
                if let Some(&offset) = self.names.get(key.as_str()) {
                    debug_assert!(offset < self.len());
                    self.append_u16(0xC000 | offset as u16)?;
                    return Ok(());
                }
                Some(key)
            } else {
                None
            };

            let n = unescape_label(&mut rest, &mut label)?;
            if n == 0 {
                break;
            }

            let idna: Option<SmallVec<[u8; 64]>> = match self.protocol() {
                Protocol::Dns => apply_idna(&label[..n])?,
                Protocol::Mdns | Protocol::Llmnr => undo_idna(&label[..n]),
            };
            let bytes = match &idna {
                Some(converted) => &converted[..],
                None => &label[..n],
            };

            wire_len += 1 + bytes.len();
            if wire_len > MAX_NAME_LENGTH - 1 {
                return Err(Error::NameTooLong {
                    length: wire_len + 1,
                });
            }

            let offset = self.append_label(bytes, canonical_candidate)?;

            if let Some(key) = dict_key {
                if offset <= COMPRESSION_OFFSET_MAX {
                    self.names.insert(key, offset);
                }
            }
        }

        self.append_u8(0)?;
        Ok(())
    }

    /// Appends a resource key: owner name (compressed, canonical
    /// candidate), type and class.
    pub fn append_key(&mut self, key: &ResourceKey) -> Result<usize> {
        let saved_size = self.len();
        match self.append_key_inner(key) {
            Ok(()) => Ok(saved_size),
            Err(e) => {
                self.truncate(saved_size);
                Err(e)
            }
        }
    }

    fn append_key_inner(&mut self, key: &ResourceKey) -> Result<()> {
        self.append_name(&key.name, true, true)?;
        self.append_u16(key.rtype)?;
        self.append_u16(key.class)?;
        Ok(())
    }

    fn append_type_window(&mut self, window: u8, length: u8, bitmap: &[u8; 32]) -> Result<()> {
        debug_assert!(length > 0 && length <= 32);

        self.append_u8(window)?;
        self.append_u8(length)?;
        self.append_blob(&bitmap[..length as usize])?;
        Ok(())
    }

    /// Appends an NSEC/NSEC3 type bitmap as ordered windows
    /// (RFC 4034 §4.1.2). Windows with no bits set are omitted, as are
    /// trailing zero bytes within a window.
    fn append_types(&mut self, types: &TypeBitmap) -> Result<()> {
        let mut window = 0u8;
        let mut entry = 0u8;
        let mut bitmap = [0u8; 32];

        for n in types.iter() {
            if (n >> 8) as u8 != window && bitmap[entry as usize / 8] != 0 {
                self.append_type_window(window, entry / 8 + 1, &bitmap)?;
                bitmap = [0u8; 32];
            }

            window = (n >> 8) as u8;
            entry = (n & 0xFF) as u8;
            bitmap[entry as usize / 8] |= 1 << (7 - entry % 8);
        }

        if bitmap[entry as usize / 8] != 0 {
            self.append_type_window(window, entry / 8 + 1, &bitmap)?;
        }

        Ok(())
    }

    /// Appends the EDNS(0) OPT pseudo-record (RFC 6891): root owner,
    /// advertised UDP size as the class, extended rcode/version/flags as
    /// the TTL, and an empty RDATA.
    ///
    /// `max_udp_size` must not advertise less than the pre-EDNS maximum of
    /// 512 bytes.
    pub fn append_opt_rr(&mut self, max_udp_size: u16, edns0_do: bool) -> Result<usize> {
        assert!(max_udp_size >= UNICAST_PACKET_SIZE_MAX);

        let saved_size = self.len();
        match self.append_opt_rr_inner(max_udp_size, edns0_do) {
            Ok(()) => Ok(saved_size),
            Err(e) => {
                self.truncate(saved_size);
                Err(e)
            }
        }
    }

    fn append_opt_rr_inner(&mut self, max_udp_size: u16, edns0_do: bool) -> Result<()> {
        // Root owner name.
        self.append_u8(0)?;
        self.append_u16(RecordType::OPT.to_u16())?;
        // Class carries the maximum UDP payload we can receive.
        self.append_u16(max_udp_size)?;
        // TTL carries extended RCODE, version and flags.
        self.append_u16(0)?;
        self.append_u16(if edns0_do { EDNS0_OPT_DO } else { 0 })?;
        // Empty RDATA.
        self.append_u16(0)?;
        Ok(())
    }

    /// Appends a resource record, returning the offsets of the record and
    /// of its RDATA.
    ///
    /// The RDLENGTH slot is written as zero first and patched once the
    /// payload size is known.
    pub fn append_rr(&mut self, rr: &ResourceRecord) -> Result<(usize, usize)> {
        let saved_size = self.len();
        match self.append_rr_inner(rr) {
            Ok(rdata_start) => Ok((saved_size, rdata_start)),
            Err(e) => {
                self.truncate(saved_size);
                Err(e)
            }
        }
    }

    fn append_rr_inner(&mut self, rr: &ResourceRecord) -> Result<usize> {
        self.append_key(&rr.key)?;
        self.append_u32(rr.ttl)?;
        let rdlength_offset = self.append_u16(0)?;
        let rdata_start = self.len();

        match &rr.rdata {
            RData::A(addr) => {
                self.append_blob(&addr.octets())?;
            }

            RData::Aaaa(addr) => {
                self.append_blob(&addr.octets())?;
            }

            RData::Ns(target)
            | RData::Cname(target)
            | RData::Dname(target)
            | RData::Ptr(target) => {
                self.append_name(target, true, false)?;
            }

            RData::Soa {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => {
                self.append_name(mname, true, false)?;
                self.append_name(rname, true, false)?;
                self.append_u32(*serial)?;
                self.append_u32(*refresh)?;
                self.append_u32(*retry)?;
                self.append_u32(*expire)?;
                self.append_u32(*minimum)?;
            }

            RData::Mx { priority, exchange } => {
                self.append_u16(*priority)?;
                self.append_name(exchange, true, false)?;
            }

            RData::Srv {
                priority,
                weight,
                port,
                target,
            } => {
                self.append_u16(*priority)?;
                self.append_u16(*weight)?;
                self.append_u16(*port)?;
                // Deployed practice compresses the target, RFC 2782
                // notwithstanding.
                self.append_name(target, true, false)?;
            }

            RData::Txt(items) | RData::Spf(items) => {
                if items.is_empty() {
                    // RFC 6763 §6.1: an empty TXT RR is one empty string.
                    self.append_raw_string(&[])?;
                } else {
                    for item in items {
                        self.append_raw_string(item.as_bytes())?;
                    }
                }
            }

            RData::Hinfo { cpu, os } => {
                self.append_string(cpu)?;
                self.append_string(os)?;
            }

            RData::Loc {
                version,
                size,
                horiz_pre,
                vert_pre,
                latitude,
                longitude,
                altitude,
            } => {
                self.append_u8(*version)?;
                self.append_u8(*size)?;
                self.append_u8(*horiz_pre)?;
                self.append_u8(*vert_pre)?;
                self.append_u32(*latitude)?;
                self.append_u32(*longitude)?;
                self.append_u32(*altitude)?;
            }

            RData::Ds {
                key_tag,
                algorithm,
                digest_type,
                digest,
            } => {
                self.append_u16(*key_tag)?;
                self.append_u8(*algorithm)?;
                self.append_u8(*digest_type)?;
                self.append_blob(digest)?;
            }

            RData::Sshfp {
                algorithm,
                fptype,
                fingerprint,
            } => {
                self.append_u8(*algorithm)?;
                self.append_u8(*fptype)?;
                self.append_blob(fingerprint)?;
            }

            RData::Dnskey {
                flags,
                protocol,
                algorithm,
                key,
            } => {
                self.append_u16(*flags)?;
                self.append_u8(*protocol)?;
                self.append_u8(*algorithm)?;
                self.append_blob(key)?;
            }

            RData::Rrsig {
                type_covered,
                algorithm,
                labels,
                original_ttl,
                expiration,
                inception,
                key_tag,
                signer,
                signature,
            } => {
                self.append_u16(*type_covered)?;
                self.append_u8(*algorithm)?;
                self.append_u8(*labels)?;
                self.append_u32(*original_ttl)?;
                self.append_u32(*expiration)?;
                self.append_u32(*inception)?;
                self.append_u16(*key_tag)?;
                // The signer enters the signature computation: never
                // compressed, always a canonical-form candidate.
                self.append_name(signer, false, true)?;
                self.append_blob(signature)?;
            }

            RData::Nsec {
                next_domain_name,
                types,
            } => {
                self.append_name(next_domain_name, false, false)?;
                self.append_types(types)?;
            }

            RData::Nsec3 {
                algorithm,
                flags,
                iterations,
                salt,
                next_hashed_name,
                types,
            } => {
                if salt.len() > 255 || next_hashed_name.len() > 255 {
                    return Err(Error::malformed(self.len(), "NSEC3 field longer than 255 bytes"));
                }

                self.append_u8(*algorithm)?;
                self.append_u8(*flags)?;
                self.append_u16(*iterations)?;
                self.append_u8(salt.len() as u8)?;
                self.append_blob(salt)?;
                self.append_u8(next_hashed_name.len() as u8)?;
                self.append_blob(next_hashed_name)?;
                self.append_types(types)?;
            }

            // Unknown types, unparseable payloads and the OPT body go out
            // exactly as they came in.
            RData::Generic(data) => {
                self.append_blob(data)?;
            }
        }

        let rdlength = self.len() - rdlength_offset - 2;
        if rdlength > 0xFFFF {
            return Err(Error::MessageTooBig { size: self.len() });
        }
        self.put_u16(rdlength_offset, rdlength as u16);

        Ok(rdata_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::CLASS_IN;
    use crate::HEADER_SIZE;

    fn packet(protocol: Protocol) -> Packet {
        Packet::new(protocol, 1500)
    }

    #[test]
    fn test_append_primitives() {
        let mut p = packet(Protocol::Dns);
        p.append_u8(0x01).unwrap();
        p.append_u16(0x0203).unwrap();
        p.append_u32(0x04050607).unwrap();
        p.append_blob(&[0x08, 0x09]).unwrap();

        assert_eq!(
            &p.data()[HEADER_SIZE..],
            &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09]
        );
    }

    #[test]
    fn test_append_raw_string() {
        let mut p = packet(Protocol::Dns);
        p.append_raw_string(b"hi").unwrap();
        assert_eq!(&p.data()[HEADER_SIZE..], &[2, b'h', b'i']);

        let long = vec![0u8; 256];
        assert!(p.append_raw_string(&long).is_err());
    }

    #[test]
    fn test_append_name_simple() {
        let mut p = packet(Protocol::Dns);
        let start = p.append_name("example.com.", true, false).unwrap();
        assert_eq!(start, HEADER_SIZE);
        assert_eq!(
            &p.data()[HEADER_SIZE..],
            b"\x07example\x03com\x00"
        );
    }

    #[test]
    fn test_append_name_root() {
        let mut p = packet(Protocol::Dns);
        p.append_name(".", true, false).unwrap();
        assert_eq!(&p.data()[HEADER_SIZE..], &[0]);
    }

    #[test]
    fn test_append_name_compression() {
        let mut p = packet(Protocol::Dns);
        p.append_name("example.com.", true, false).unwrap();
        let second = p.append_name("www.example.com.", true, false).unwrap();

        // "www" label plus a pointer to offset 12.
        assert_eq!(
            &p.data()[second..],
            &[3, b'w', b'w', b'w', 0xC0, HEADER_SIZE as u8]
        );

        // Case differences still compress.
        let third = p.append_name("EXAMPLE.COM.", true, false).unwrap();
        assert_eq!(&p.data()[third..], &[0xC0, HEADER_SIZE as u8]);
    }

    #[test]
    fn test_append_name_refuse_compression() {
        let mut p = packet(Protocol::Dns);
        p.set_refuse_compression(true);
        p.append_name("example.com.", true, false).unwrap();
        let second = p.append_name("example.com.", true, false).unwrap();
        assert_eq!(&p.data()[second..], b"\x07example\x03com\x00");
    }

    #[test]
    fn test_append_name_canonical_form() {
        let mut p = packet(Protocol::Dns);
        p.set_canonical_form(true);
        p.append_name("ExAmPle.COM.", false, true).unwrap();
        assert_eq!(&p.data()[HEADER_SIZE..], b"\x07example\x03com\x00");

        // Non-candidates keep their case even in canonical form.
        let mut p = packet(Protocol::Mdns);
        p.set_canonical_form(true);
        p.append_name("My\\032Printer.local.", false, false).unwrap();
        assert_eq!(&p.data()[HEADER_SIZE..], b"\x0aMy Printer\x05local\x00");
    }

    #[test]
    fn test_append_name_idna() {
        let mut p = packet(Protocol::Dns);
        p.append_name("bücher.example.", false, false).unwrap();
        assert_eq!(
            &p.data()[HEADER_SIZE..],
            b"\x0dxn--bcher-kva\x07example\x00"
        );

        let mut p = packet(Protocol::Mdns);
        p.append_name("xn--bcher-kva.local.", false, false).unwrap();
        assert_eq!(
            &p.data()[HEADER_SIZE..],
            b"\x07b\xc3\xbccher\x05local\x00"
        );
    }

    #[test]
    fn test_append_name_limits() {
        let mut p = packet(Protocol::Dns);

        let label63 = "a".repeat(63);
        p.append_name(&format!("{label63}."), false, false).unwrap();

        let label64 = "a".repeat(64);
        assert!(matches!(
            p.append_name(&format!("{label64}."), false, false),
            Err(Error::LabelTooLong { .. })
        ));

        // 255 wire bytes fit, 256 do not.
        let ok = format!(
            "{}.{}.{}.{}.",
            "a".repeat(63),
            "b".repeat(63),
            "c".repeat(63),
            "d".repeat(61)
        );
        p.append_name(&ok, false, false).unwrap();

        let too_long = format!(
            "{}.{}.{}.{}.",
            "a".repeat(63),
            "b".repeat(63),
            "c".repeat(63),
            "d".repeat(62)
        );
        assert!(matches!(
            p.append_name(&too_long, false, false),
            Err(Error::NameTooLong { .. })
        ));
    }

    #[test]
    fn test_append_rollback_restores_state() {
        let mut p = packet(Protocol::Dns);
        p.append_name("example.com.", true, false).unwrap();
        let size = p.len();
        let dict = p.names.len();

        // The owner name goes in first and registers a new suffix; the
        // oversized HINFO string then fails the record, which must roll
        // all of it back.
        let rr = ResourceRecord::new(
            ResourceKey::new("www.example.com.", RecordType::HINFO.to_u16()),
            60,
            RData::Hinfo {
                cpu: "x".repeat(256),
                os: "linux".to_owned(),
            },
        );
        assert!(p.append_rr(&rr).is_err());

        assert_eq!(p.len(), size);
        assert_eq!(p.names.len(), dict);

        // A partially written name with compression disabled rolls back
        // the same way.
        let bad = format!("www.{}.example.com.", "x".repeat(64));
        assert!(p.append_name(&bad, false, false).is_err());
        assert_eq!(p.len(), size);
    }

    #[test]
    fn test_append_key() {
        let mut p = packet(Protocol::Dns);
        let key = ResourceKey::new("example.com.", RecordType::A.to_u16());
        p.append_key(&key).unwrap();

        assert_eq!(p.len(), 29);
        assert_eq!(&p.data()[25..29], &[0x00, 0x01, 0x00, 0x01]);
    }

    #[test]
    fn test_append_opt_rr() {
        let mut p = packet(Protocol::Dns);
        p.append_opt_rr(4096, true).unwrap();

        assert_eq!(
            &p.data()[HEADER_SIZE..],
            &[
                0x00, // root
                0x00, 0x29, // OPT
                0x10, 0x00, // max udp size 4096
                0x00, 0x00, 0x80, 0x00, // ext rcode/version, DO flag
                0x00, 0x00, // rdlength
            ]
        );
    }

    #[test]
    #[should_panic]
    fn test_append_opt_rr_rejects_small_size() {
        let mut p = packet(Protocol::Dns);
        let _ = p.append_opt_rr(511, false);
    }

    #[test]
    fn test_append_rr_patches_rdlength() {
        let mut p = packet(Protocol::Dns);
        let rr = ResourceRecord::new(
            ResourceKey::new("example.com.", RecordType::A.to_u16()),
            3600,
            RData::A([192, 0, 2, 1].into()),
        );
        let (start, rdata_start) = p.append_rr(&rr).unwrap();

        assert_eq!(start, HEADER_SIZE);
        // name(13) + type(2) + class(2) + ttl(4) + rdlength(2)
        assert_eq!(rdata_start, HEADER_SIZE + 21);
        assert_eq!(&p.data()[rdata_start - 2..rdata_start], &[0x00, 0x04]);
        assert_eq!(&p.data()[rdata_start..], &[192, 0, 2, 1]);
    }

    #[test]
    fn test_append_empty_txt() {
        let mut p = packet(Protocol::Dns);
        let rr = ResourceRecord::new(
            ResourceKey::new("example.com.", RecordType::TXT.to_u16()),
            300,
            RData::Txt(Vec::new()),
        );
        let (_, rdata_start) = p.append_rr(&rr).unwrap();
        assert_eq!(&p.data()[rdata_start..], &[0x00]);
    }

    #[test]
    fn test_append_types_windows() {
        let mut p = packet(Protocol::Dns);
        let types: TypeBitmap = [
            RecordType::A.to_u16(),     // 1
            RecordType::MX.to_u16(),    // 15
            RecordType::AAAA.to_u16(),  // 28
            257,                        // window 1, bit 1
        ]
        .into_iter()
        .collect();
        p.append_types(&types).unwrap();

        assert_eq!(
            &p.data()[HEADER_SIZE..],
            &[
                0x00, 4, 0x40, 0x01, 0x00, 0x08, // window 0: A, MX, AAAA
                0x01, 1, 0x40, // window 1: type 257
            ]
        );
    }

    #[test]
    fn test_append_srv_uses_key_compression() {
        let mut p = packet(Protocol::Dns);
        let rr = ResourceRecord::new(
            ResourceKey::with_class("_ldap._tcp.example.com.", RecordType::SRV.to_u16(), CLASS_IN),
            600,
            RData::Srv {
                priority: 0,
                weight: 5,
                port: 389,
                target: "ldap.example.com.".into(),
            },
        );
        let (_, rdata_start) = p.append_rr(&rr).unwrap();

        // Target ends with a pointer into the owner name.
        let tail = &p.data()[rdata_start + 6..];
        assert_eq!(tail[0], 4);
        assert_eq!(&tail[1..5], b"ldap");
        assert_eq!(tail[5] & 0xC0, 0xC0);
    }
}
