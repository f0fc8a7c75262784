//! The read side of the packet: primitives, names with pointer-loop
//! defenses, keys, resource records and type bitmaps.
//!
//! Every compound read snapshots the cursor on entry and rewinds to it on
//! any failure; the parser never hands out partially-filled values. The
//! append-side counterparts of the per-type RDATA parsers live in
//! `append.rs`; keep the two dispatch tables in step when adding a type.

use super::Packet;
use crate::bitmap::TypeBitmap;
use crate::class::{self, CLASS_MASK, MDNS_CACHE_FLUSH};
use crate::error::{Error, Result};
use crate::name;
use crate::question::ResourceKey;
use crate::rdata::{RData, TxtItem};
use crate::record::ResourceRecord;
use crate::rtype::{self, RecordType};
use crate::{Protocol, HEADER_SIZE};
use compact_str::CompactString;

/// LOC size/precision fields are base/exponent pairs of decimal digits
/// (RFC 1876 §2).
fn loc_size_ok(size: u8) -> bool {
    let m = size >> 4;
    let e = size & 0x0F;
    m <= 9 && e <= 9 && (m > 0 || e == 0)
}

impl Packet {
    /// Advances the cursor over `n` bytes, returning their starting
    /// offset. Fails without moving when fewer than `n` valid bytes
    /// remain.
    pub(crate) fn read(&mut self, n: usize) -> Result<usize> {
        if self.rindex + n > self.buf.len() {
            return Err(Error::truncated(self.rindex + n, self.buf.len()));
        }

        let start = self.rindex;
        self.rindex += n;
        Ok(start)
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let start = self.read(1)?;
        Ok(self.buf[start])
    }

    /// Reads a big-endian u16.
    pub fn read_u16(&mut self) -> Result<u16> {
        let start = self.read(2)?;
        Ok(u16::from_be_bytes([self.buf[start], self.buf[start + 1]]))
    }

    /// Reads a big-endian u32.
    pub fn read_u32(&mut self) -> Result<u32> {
        let start = self.read(4)?;
        Ok(u32::from_be_bytes([
            self.buf[start],
            self.buf[start + 1],
            self.buf[start + 2],
            self.buf[start + 3],
        ]))
    }

    /// Reads `n` raw bytes into an owned buffer.
    pub fn read_blob(&mut self, n: usize) -> Result<Vec<u8>> {
        let start = self.read(n)?;
        Ok(self.buf[start..start + n].to_vec())
    }

    /// Reads a length-prefixed byte string.
    pub fn read_raw_string(&mut self) -> Result<Vec<u8>> {
        let saved_rindex = self.rindex;
        match self.read_raw_string_inner() {
            Ok(v) => Ok(v),
            Err(e) => {
                self.rindex = saved_rindex;
                Err(e)
            }
        }
    }

    fn read_raw_string_inner(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u8()?;
        self.read_blob(len as usize)
    }

    /// Reads a length-prefixed character string: valid UTF-8, no embedded
    /// NUL bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let saved_rindex = self.rindex;
        match self.read_string_inner() {
            Ok(s) => Ok(s),
            Err(e) => {
                self.rindex = saved_rindex;
                Err(e)
            }
        }
    }

    fn read_string_inner(&mut self) -> Result<String> {
        let len = self.read_u8()?;
        let start = self.read(len as usize)?;
        let bytes = &self.buf[start..start + len as usize];

        if bytes.contains(&0) {
            return Err(Error::malformed(start, "embedded NUL in string"));
        }

        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| Error::malformed(start, "string is not valid UTF-8"))
    }

    /// Reads a domain name into escaped text form with a trailing dot.
    ///
    /// Compression pointers, when allowed, may only reference a prior
    /// occurrence (RFC 1035 §4.1.4): each pointer target must lie strictly
    /// before the previous one, which rules out loops, self-references and
    /// forward references. The cursor ends just past the name's first
    /// pointer, or past the terminating zero when no pointer occurred.
    pub fn read_name(&mut self, allow_compression: bool) -> Result<CompactString> {
        let allow_compression = allow_compression && !self.refuse_compression;

        let saved_rindex = self.rindex;
        match self.read_name_inner(allow_compression) {
            Ok(name) => Ok(name),
            Err(e) => {
                self.rindex = saved_rindex;
                Err(e)
            }
        }
    }

    fn read_name_inner(&mut self, allow_compression: bool) -> Result<CompactString> {
        let mut jump_barrier = self.rindex;
        let mut after_rindex = 0usize;
        let mut out = String::new();

        loop {
            let c = self.read_u8()?;

            if c == 0 {
                // End of name.
                break;
            } else if c <= 63 {
                // Literal label.
                let start = self.read(c as usize)?;
                name::escape_label(&self.buf[start..start + c as usize], &mut out);
                out.push('.');
            } else if c & 0xC0 == 0xC0 && allow_compression {
                let d = self.read_u8()?;
                let target = usize::from(c & !0xC0) << 8 | usize::from(d);

                if target < HEADER_SIZE || target >= jump_barrier {
                    return Err(Error::BadPointer {
                        offset: self.rindex - 2,
                        target,
                    });
                }

                // The cursor resumes after the first pointer; further
                // jumps only move the parse position.
                if after_rindex == 0 {
                    after_rindex = self.rindex;
                }

                jump_barrier = target;
                self.rindex = target;
            } else {
                return Err(Error::malformed(self.rindex - 1, "invalid label length byte"));
            }
        }

        if out.is_empty() {
            out.push('.');
        }

        if after_rindex != 0 {
            self.rindex = after_rindex;
        }

        Ok(CompactString::from(out))
    }

    /// Reads a resource key.
    ///
    /// For mDNS, the top bit of the class of any non-OPT record is the
    /// cache-flush bit (RFC 6762 §10.2): it is stripped from the returned
    /// class and reported separately.
    pub fn read_key(&mut self) -> Result<(ResourceKey, bool)> {
        let saved_rindex = self.rindex;
        match self.read_key_inner() {
            Ok(v) => Ok(v),
            Err(e) => {
                self.rindex = saved_rindex;
                Err(e)
            }
        }
    }

    fn read_key_inner(&mut self) -> Result<(ResourceKey, bool)> {
        let name = self.read_name(true)?;
        let rtype = self.read_u16()?;
        let mut class = self.read_u16()?;

        let mut cache_flush = false;
        if self.protocol() == Protocol::Mdns
            && rtype != RecordType::OPT.to_u16()
            && class & MDNS_CACHE_FLUSH != 0
        {
            class &= CLASS_MASK;
            cache_flush = true;
        }

        Ok((
            ResourceKey {
                name,
                rtype,
                class,
            },
            cache_flush,
        ))
    }

    fn read_type_window(&mut self, types: &mut TypeBitmap) -> Result<()> {
        let window = self.read_u8()?;
        let length = self.read_u8()?;

        if length == 0 || length > 32 {
            return Err(Error::malformed(self.rindex - 1, "bad type window length"));
        }

        let start = self.read(length as usize)?;
        let mut found = false;

        for i in 0..length as usize {
            let b = self.buf[start + i];
            if b == 0 {
                found = false;
                continue;
            }
            found = true;

            for bit in 0..8u16 {
                if b & (0x80 >> bit) != 0 {
                    let n = u16::from(window) << 8 | (i as u16 * 8 + bit);

                    // Pseudo-types have no business in a bitmap; skip them
                    // (RFC 4034 §4.1.2).
                    if !rtype::type_is_pseudo(n) {
                        types.insert(n);
                    }
                }
            }
        }

        // Trailing zero bytes must have been omitted by the sender.
        if !found {
            return Err(Error::malformed(start, "type window with trailing zero bytes"));
        }

        Ok(())
    }

    fn read_type_windows(&mut self, size: usize) -> Result<TypeBitmap> {
        let saved_rindex = self.rindex;
        match self.read_type_windows_inner(size) {
            Ok(types) => Ok(types),
            Err(e) => {
                self.rindex = saved_rindex;
                Err(e)
            }
        }
    }

    fn read_type_windows_inner(&mut self, size: usize) -> Result<TypeBitmap> {
        let end = self.rindex + size;
        let mut types = TypeBitmap::new();

        while self.rindex < end {
            self.read_type_window(&mut types)?;

            // A window must not run past the enclosing RDATA.
            if self.rindex > end {
                return Err(Error::malformed(self.rindex, "type window crosses RDATA end"));
            }
        }

        Ok(types)
    }

    /// Reads one resource record.
    ///
    /// The per-type parser must consume exactly RDLENGTH bytes; anything
    /// else is malformed. A LOC record with an unknown version is returned
    /// with `unparseable` set and its RDATA preserved raw.
    pub fn read_rr(&mut self) -> Result<(ResourceRecord, bool)> {
        let saved_rindex = self.rindex;
        match self.read_rr_inner() {
            Ok(v) => Ok(v),
            Err(e) => {
                self.rindex = saved_rindex;
                Err(e)
            }
        }
    }

    fn read_rr_inner(&mut self) -> Result<(ResourceRecord, bool)> {
        let (key, cache_flush) = self.read_key()?;

        if !class::class_is_valid_rr(key.class) {
            return Err(Error::malformed(self.rindex, "invalid RR class"));
        }
        if !rtype::type_is_valid_rr(key.rtype) {
            return Err(Error::malformed(self.rindex, "invalid RR type"));
        }

        let ttl = self.read_u32()?;
        let rdlength = self.read_u16()? as usize;

        if self.rindex + rdlength > self.buf.len() {
            return Err(Error::truncated(self.rindex + rdlength, self.buf.len()));
        }

        let offset = self.rindex;
        let mut unparseable = false;

        let rdata = match RecordType::try_from(key.rtype) {
            Ok(RecordType::SRV) => RData::Srv {
                priority: self.read_u16()?,
                weight: self.read_u16()?,
                port: self.read_u16()?,
                target: self.read_name(true)?,
            },

            Ok(RecordType::NS) => RData::Ns(self.read_name(true)?),
            Ok(RecordType::CNAME) => RData::Cname(self.read_name(true)?),
            Ok(RecordType::DNAME) => RData::Dname(self.read_name(true)?),
            Ok(RecordType::PTR) => RData::Ptr(self.read_name(true)?),

            Ok(RecordType::HINFO) => RData::Hinfo {
                cpu: self.read_string()?,
                os: self.read_string()?,
            },

            Ok(t @ (RecordType::TXT | RecordType::SPF)) => {
                let mut items = Vec::new();
                if rdlength == 0 {
                    // RFC 6763 §6.1: treat an empty TXT RR as one empty
                    // string.
                    items.push(TxtItem::default());
                } else {
                    while self.rindex < offset + rdlength {
                        items.push(TxtItem(self.read_raw_string()?));
                    }
                }

                if t == RecordType::TXT {
                    RData::Txt(items)
                } else {
                    RData::Spf(items)
                }
            }

            Ok(RecordType::A) => {
                let start = self.read(4)?;
                let octets: [u8; 4] = self.buf[start..start + 4].try_into().expect("4 bytes");
                RData::A(octets.into())
            }

            Ok(RecordType::AAAA) => {
                let start = self.read(16)?;
                let octets: [u8; 16] = self.buf[start..start + 16].try_into().expect("16 bytes");
                RData::Aaaa(octets.into())
            }

            Ok(RecordType::SOA) => RData::Soa {
                mname: self.read_name(true)?,
                rname: self.read_name(true)?,
                serial: self.read_u32()?,
                refresh: self.read_u32()?,
                retry: self.read_u32()?,
                expire: self.read_u32()?,
                minimum: self.read_u32()?,
            },

            Ok(RecordType::MX) => RData::Mx {
                priority: self.read_u16()?,
                exchange: self.read_name(true)?,
            },

            Ok(RecordType::LOC) => {
                let version_offset = self.rindex;
                let version = self.read_u8()?;

                if version == 0 {
                    let size = self.read_u8()?;
                    if !loc_size_ok(size) {
                        return Err(Error::malformed(self.rindex - 1, "bad LOC size"));
                    }

                    let horiz_pre = self.read_u8()?;
                    if !loc_size_ok(horiz_pre) {
                        return Err(Error::malformed(self.rindex - 1, "bad LOC horizontal precision"));
                    }

                    let vert_pre = self.read_u8()?;
                    if !loc_size_ok(vert_pre) {
                        return Err(Error::malformed(self.rindex - 1, "bad LOC vertical precision"));
                    }

                    RData::Loc {
                        version,
                        size,
                        horiz_pre,
                        vert_pre,
                        latitude: self.read_u32()?,
                        longitude: self.read_u32()?,
                        altitude: self.read_u32()?,
                    }
                } else {
                    // Unknown LOC version: keep the payload raw.
                    self.rindex = version_offset;
                    unparseable = true;
                    RData::Generic(self.read_blob(rdlength)?)
                }
            }

            Ok(RecordType::DS) => {
                let key_tag = self.read_u16()?;
                let algorithm = self.read_u8()?;
                let digest_type = self.read_u8()?;
                let digest = self.read_trailing_blob(offset + rdlength, "empty DS digest")?;

                RData::Ds {
                    key_tag,
                    algorithm,
                    digest_type,
                    digest,
                }
            }

            Ok(RecordType::SSHFP) => {
                let algorithm = self.read_u8()?;
                let fptype = self.read_u8()?;
                let fingerprint =
                    self.read_trailing_blob(offset + rdlength, "empty SSHFP fingerprint")?;

                RData::Sshfp {
                    algorithm,
                    fptype,
                    fingerprint,
                }
            }

            Ok(RecordType::DNSKEY) => {
                let flags = self.read_u16()?;
                let protocol = self.read_u8()?;
                let algorithm = self.read_u8()?;
                let key = self.read_trailing_blob(offset + rdlength, "empty DNSKEY key")?;

                RData::Dnskey {
                    flags,
                    protocol,
                    algorithm,
                    key,
                }
            }

            Ok(RecordType::RRSIG) => {
                let type_covered = self.read_u16()?;
                let algorithm = self.read_u8()?;
                let labels = self.read_u8()?;
                let original_ttl = self.read_u32()?;
                let expiration = self.read_u32()?;
                let inception = self.read_u32()?;
                let key_tag = self.read_u16()?;
                // The signer is never compressed (RFC 4034 §3.1.7).
                let signer = self.read_name(false)?;
                let signature =
                    self.read_trailing_blob(offset + rdlength, "empty RRSIG signature")?;

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
                }
            }

            Ok(RecordType::NSEC) => {
                // RFC 6762 §18.14 wants compression here for mDNS, while
                // RFC 3845 §2.1.1 forbids it for classic DNS.
                let allow_compressed = self.protocol() == Protocol::Mdns;

                let next_domain_name = self.read_name(allow_compressed)?;
                let window_size = (offset + rdlength).saturating_sub(self.rindex);
                // The bit for the NSEC record itself is redundant and an
                // empty bitmap has defined uses, so both are accepted.
                let types = self.read_type_windows(window_size)?;

                RData::Nsec {
                    next_domain_name,
                    types,
                }
            }

            Ok(RecordType::NSEC3) => {
                let algorithm = self.read_u8()?;
                let flags = self.read_u8()?;
                let iterations = self.read_u16()?;

                // The salt may be empty.
                let salt_len = self.read_u8()?;
                let salt = self.read_blob(salt_len as usize)?;

                let hash_len = self.read_u8()?;
                if hash_len == 0 {
                    return Err(Error::malformed(self.rindex - 1, "empty NSEC3 next hashed name"));
                }
                let next_hashed_name = self.read_blob(hash_len as usize)?;

                let window_size = (offset + rdlength).saturating_sub(self.rindex);
                // Empty non-terminals carry NSEC3 records with empty
                // bitmaps.
                let types = self.read_type_windows(window_size)?;

                RData::Nsec3 {
                    algorithm,
                    flags,
                    iterations,
                    salt,
                    next_hashed_name,
                    types,
                }
            }

            // Only the pseudo-header of OPT is interpreted; its body and
            // any unknown type are carried raw.
            _ => RData::Generic(self.read_blob(rdlength)?),
        };

        if self.rindex != offset + rdlength {
            return Err(Error::malformed(self.rindex, "RDATA length mismatch"));
        }

        Ok((
            ResourceRecord {
                key,
                ttl,
                rdata,
                unparseable,
            },
            cache_flush,
        ))
    }

    /// Reads the rest of the current RDATA as a blob that must not be
    /// empty.
    fn read_trailing_blob(&mut self, rdata_end: usize, what: &'static str) -> Result<Vec<u8>> {
        let n = rdata_end.saturating_sub(self.rindex);
        if n == 0 {
            return Err(Error::malformed(self.rindex, what));
        }
        self.read_blob(n)
    }
}
