//! The DNS packet buffer.
//!
//! A [`Packet`] is one owned, growable byte buffer holding a message in
//! wire format, together with a read cursor, a name-compression dictionary
//! for the append side, and the parsed-once question/answer cache filled by
//! [`Packet::extract`].
//!
//! Appends and reads are transactional: any compound operation that fails
//! leaves the append size (and the dictionary) or the read cursor exactly
//! as they were when the operation started.

mod append;
mod read;

use crate::error::{Error, Result};
use crate::question::{Question, ResourceKey};
use crate::record::{Answer, AnswerFlags, ResourceRecord};
use crate::rtype::{self, RecordType};
use crate::{Protocol, HEADER_SIZE, MAX_PACKET_SIZE, PACKET_SIZE_START, UDP_HEADER_SIZE};
use bitflags::bitflags;
use bytes::BytesMut;
use compact_str::CompactString;
use hashbrown::HashMap;
use tracing::{debug, trace};

bitflags! {
    /// Single-bit header flags (RFC 1035 §4.1.1). The 4-bit OPCODE and
    /// RCODE fields live between these bits and are handled separately.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HeaderFlags: u16 {
        /// Query/response.
        const QR = 0x8000;
        /// Authoritative answer.
        const AA = 0x0400;
        /// Truncated.
        const TC = 0x0200;
        /// Recursion desired.
        const RD = 0x0100;
        /// Recursion available.
        const RA = 0x0080;
        /// Authentic data (RFC 4035).
        const AD = 0x0020;
        /// Checking disabled (RFC 4035).
        const CD = 0x0010;
    }
}

/// A DNS, mDNS or LLMNR message in wire format.
#[derive(Debug)]
pub struct Packet {
    protocol: Protocol,
    buf: BytesMut,
    /// Logical capacity; the buffer never grows past this without a fresh
    /// size check against [`MAX_PACKET_SIZE`].
    allocated: usize,
    rindex: usize,
    /// Compression dictionary: canonical name suffix to the offset where
    /// it was first written. Offsets are always below 0x4000.
    names: HashMap<CompactString, usize>,
    canonical_form: bool,
    refuse_compression: bool,
    ifindex: u32,
    tail: Option<Box<Packet>>,
    question: Option<Question>,
    answer: Option<Answer>,
    opt: Option<ResourceRecord>,
    extracted: bool,
}

fn page_align(n: usize) -> usize {
    (n + 4095) & !4095
}

impl Packet {
    /// Creates an empty packet sized to the given MTU hint, with a zeroed
    /// header.
    pub fn new(protocol: Protocol, mtu: usize) -> Self {
        let mut a = if mtu <= UDP_HEADER_SIZE {
            PACKET_SIZE_START
        } else {
            mtu - UDP_HEADER_SIZE
        };
        if a < HEADER_SIZE {
            a = HEADER_SIZE;
        }
        a = page_align(a).min(MAX_PACKET_SIZE);

        let mut buf = BytesMut::with_capacity(a);
        buf.resize(HEADER_SIZE, 0);

        Self {
            protocol,
            buf,
            allocated: a,
            rindex: HEADER_SIZE,
            names: HashMap::new(),
            canonical_form: false,
            refuse_compression: false,
            ifindex: 0,
            tail: None,
            question: None,
            answer: None,
            opt: None,
            extracted: false,
        }
    }

    /// Creates a query packet: a fresh packet with its flags set for the
    /// protocol. The TC bit starts out clear; it is raised shortly before
    /// sending if a continuation packet turns out to be needed.
    pub fn new_query(protocol: Protocol, mtu: usize, dnssec_checking_disabled: bool) -> Self {
        let mut p = Self::new(protocol, mtu);
        p.set_flags(dnssec_checking_disabled, false);
        p
    }

    /// Wraps received bytes in a packet. The read cursor starts just past
    /// the header; nothing is parsed until [`Packet::extract`] runs.
    pub fn from_wire(protocol: Protocol, data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::truncated(HEADER_SIZE, data.len()));
        }
        if data.len() > MAX_PACKET_SIZE {
            return Err(Error::MessageTooBig { size: data.len() });
        }

        let mut p = Self::new(protocol, 0);
        p.allocated = page_align(data.len()).min(MAX_PACKET_SIZE).max(data.len());
        p.buf.clear();
        p.buf.extend_from_slice(data);
        Ok(p)
    }

    /// Returns the packet's protocol.
    #[inline]
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Returns the valid wire bytes, ready for the transceiver.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    /// Returns the logical packet size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns false: a packet always carries at least its header.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the read cursor position.
    #[inline]
    pub const fn rindex(&self) -> usize {
        self.rindex
    }

    /// Returns the interface index attached to this packet.
    #[inline]
    pub const fn ifindex(&self) -> u32 {
        self.ifindex
    }

    /// Attaches the interface index a received packet arrived on. It is
    /// propagated to the answer items produced by [`Packet::extract`].
    #[inline]
    pub fn set_ifindex(&mut self, ifindex: u32) {
        self.ifindex = ifindex;
    }

    /// Enables DNSSEC canonical form: labels flagged as candidates are
    /// ASCII-lowercased as they are appended (RFC 4034 §6.2).
    #[inline]
    pub fn set_canonical_form(&mut self, canonical: bool) {
        self.canonical_form = canonical;
    }

    /// Disables name compression on both append and read, for packets that
    /// feed DNSSEC signature verification or strict interop paths.
    #[inline]
    pub fn set_refuse_compression(&mut self, refuse: bool) {
        self.refuse_compression = refuse;
    }

    /// Attaches a continuation packet, taking the place of any previous
    /// one. Used when a response does not fit one datagram.
    #[inline]
    pub fn set_tail(&mut self, tail: Option<Packet>) {
        self.tail = tail.map(Box::new);
    }

    /// Detaches and returns the continuation packet, if any.
    #[inline]
    pub fn take_tail(&mut self) -> Option<Packet> {
        self.tail.take().map(|b| *b)
    }

    /// Returns the continuation packet, if any.
    #[inline]
    pub fn tail(&self) -> Option<&Packet> {
        self.tail.as_deref()
    }

    // =========================================================================
    // Header field access
    // =========================================================================

    fn get_u16(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.buf[offset], self.buf[offset + 1]])
    }

    fn put_u16(&mut self, offset: usize, value: u16) {
        self.buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
    }

    /// Returns the transaction id.
    #[inline]
    pub fn id(&self) -> u16 {
        self.get_u16(0)
    }

    /// Sets the transaction id.
    #[inline]
    pub fn set_id(&mut self, id: u16) {
        self.put_u16(0, id);
    }

    /// Assigns a random transaction id and returns it.
    pub fn randomize_id(&mut self) -> u16 {
        let id: u16 = rand::random();
        self.set_id(id);
        id
    }

    fn flags_word(&self) -> u16 {
        self.get_u16(2)
    }

    /// Returns the QR bit: true for a response.
    #[inline]
    pub fn qr(&self) -> bool {
        self.flags_word() & HeaderFlags::QR.bits() != 0
    }

    /// Returns the 4-bit OPCODE field.
    #[inline]
    pub fn opcode(&self) -> u8 {
        ((self.flags_word() >> 11) & 0x0F) as u8
    }

    /// Returns the AA bit.
    #[inline]
    pub fn aa(&self) -> bool {
        self.flags_word() & HeaderFlags::AA.bits() != 0
    }

    /// Returns the TC bit.
    #[inline]
    pub fn tc(&self) -> bool {
        self.flags_word() & HeaderFlags::TC.bits() != 0
    }

    /// Returns the RD bit.
    #[inline]
    pub fn rd(&self) -> bool {
        self.flags_word() & HeaderFlags::RD.bits() != 0
    }

    /// Returns the RA bit.
    #[inline]
    pub fn ra(&self) -> bool {
        self.flags_word() & HeaderFlags::RA.bits() != 0
    }

    /// Returns the AD bit.
    #[inline]
    pub fn ad(&self) -> bool {
        self.flags_word() & HeaderFlags::AD.bits() != 0
    }

    /// Returns the CD bit.
    #[inline]
    pub fn cd(&self) -> bool {
        self.flags_word() & HeaderFlags::CD.bits() != 0
    }

    /// Returns the 4-bit header RCODE field.
    #[inline]
    pub fn rcode(&self) -> u8 {
        (self.flags_word() & 0x0F) as u8
    }

    /// Returns the question count.
    #[inline]
    pub fn qdcount(&self) -> u16 {
        self.get_u16(4)
    }

    /// Sets the question count.
    #[inline]
    pub fn set_qdcount(&mut self, n: u16) {
        self.put_u16(4, n);
    }

    /// Returns the answer count.
    #[inline]
    pub fn ancount(&self) -> u16 {
        self.get_u16(6)
    }

    /// Sets the answer count.
    #[inline]
    pub fn set_ancount(&mut self, n: u16) {
        self.put_u16(6, n);
    }

    /// Returns the authority count.
    #[inline]
    pub fn nscount(&self) -> u16 {
        self.get_u16(8)
    }

    /// Sets the authority count.
    #[inline]
    pub fn set_nscount(&mut self, n: u16) {
        self.put_u16(8, n);
    }

    /// Returns the additional count.
    #[inline]
    pub fn arcount(&self) -> u16 {
        self.get_u16(10)
    }

    /// Sets the additional count.
    #[inline]
    pub fn set_arcount(&mut self, n: u16) {
        self.put_u16(10, n);
    }

    /// Returns the total record count of the answer, authority and
    /// additional sections.
    #[inline]
    pub fn rrcount(&self) -> usize {
        self.ancount() as usize + self.nscount() as usize + self.arcount() as usize
    }

    fn make_flags(flags: HeaderFlags, opcode: u8, rcode: u8) -> u16 {
        flags.bits() | (u16::from(opcode & 0x0F) << 11) | u16::from(rcode & 0x0F)
    }

    /// Rewrites the header flags word for an outgoing packet.
    ///
    /// The layout depends on the protocol: classic DNS asks for recursion
    /// and carries the caller's CD bit, LLMNR sends all flags zero, and
    /// mDNS uses only TC. `truncated` is a caller contract violation
    /// outside mDNS.
    pub fn set_flags(&mut self, dnssec_checking_disabled: bool, truncated: bool) {
        let flags = match self.protocol {
            Protocol::Llmnr => {
                assert!(!truncated);
                HeaderFlags::empty()
            }
            Protocol::Mdns => {
                if truncated {
                    HeaderFlags::TC
                } else {
                    HeaderFlags::empty()
                }
            }
            Protocol::Dns => {
                assert!(!truncated);
                let mut f = HeaderFlags::RD;
                if dnssec_checking_disabled {
                    f |= HeaderFlags::CD;
                }
                f
            }
        };

        let word = Self::make_flags(flags, 0, 0);
        self.put_u16(2, word);
    }

    // =========================================================================
    // Buffer management
    // =========================================================================

    /// Reserves `add` bytes at the end of the packet, zero-filled, and
    /// returns the offset of the reserved region.
    pub(crate) fn extend(&mut self, add: usize) -> Result<usize> {
        let needed = self.buf.len() + add;
        if needed > self.allocated {
            let a = page_align(needed * 2).min(MAX_PACKET_SIZE);
            if needed > a {
                return Err(Error::MessageTooBig { size: needed });
            }
            self.buf.reserve(a - self.buf.len());
            self.allocated = a;
        }

        let start = self.buf.len();
        self.buf.resize(start + add, 0);
        Ok(start)
    }

    /// Discards everything from `to` onward and drops compression
    /// dictionary entries pointing at the discarded region. This is the
    /// rollback primitive of every compound append.
    pub fn truncate(&mut self, to: usize) {
        debug_assert!(to >= HEADER_SIZE);

        if to >= self.buf.len() {
            return;
        }

        self.names.retain(|_, offset| *offset < to);
        self.buf.truncate(to);
    }

    /// Moves the read cursor to an absolute offset within the valid bytes.
    pub fn rewind(&mut self, idx: usize) {
        assert!(idx >= HEADER_SIZE);
        assert!(idx <= self.buf.len());
        self.rindex = idx;
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Checks the structural minimum: a complete header within the size
    /// limit.
    pub fn validate(&self) -> Result<()> {
        if self.buf.len() < HEADER_SIZE {
            return Err(Error::truncated(HEADER_SIZE, self.buf.len()));
        }
        if self.buf.len() > MAX_PACKET_SIZE {
            return Err(Error::MessageTooBig {
                size: self.buf.len(),
            });
        }
        Ok(())
    }

    /// Checks whether the packet is a plausible reply.
    ///
    /// Returns `Ok(false)` when the QR bit says this is not a reply at
    /// all, and an error when the packet claims to be one but violates the
    /// protocol's rules.
    pub fn validate_reply(&self) -> Result<bool> {
        self.validate()?;

        if !self.qr() {
            return Ok(false);
        }

        if self.opcode() != 0 {
            return Err(Error::malformed(2, "reply with non-query opcode"));
        }

        match self.protocol {
            // RFC 4795 §2.1.1: discard replies with QDCOUNT != 1.
            Protocol::Llmnr => {
                if self.qdcount() != 1 {
                    return Err(Error::malformed(4, "LLMNR reply without single question"));
                }
            }
            // RFC 6762 §18.3.
            Protocol::Mdns => {
                if self.rcode() != 0 {
                    return Err(Error::malformed(2, "mDNS reply with nonzero rcode"));
                }
            }
            Protocol::Dns => {}
        }

        Ok(true)
    }

    /// Checks whether the packet is a plausible query.
    ///
    /// Returns `Ok(false)` when the QR bit says this is a reply, and an
    /// error when the query violates the protocol's rules.
    pub fn validate_query(&self) -> Result<bool> {
        self.validate()?;

        if self.qr() {
            return Ok(false);
        }

        if self.opcode() != 0 {
            return Err(Error::malformed(2, "query with non-query opcode"));
        }

        if self.tc() {
            return Err(Error::malformed(2, "query with TC bit set"));
        }

        match self.protocol {
            // RFC 4795 §2.1.1: discard queries unless QDCOUNT is 1 and the
            // answer and authority sections are empty.
            Protocol::Llmnr => {
                if self.qdcount() != 1 {
                    return Err(Error::malformed(4, "LLMNR query without single question"));
                }
                if self.ancount() > 0 {
                    return Err(Error::malformed(6, "LLMNR query with answers"));
                }
                if self.nscount() > 0 {
                    return Err(Error::malformed(8, "LLMNR query with authority records"));
                }
            }
            // RFC 6762 §18.
            Protocol::Mdns => {
                if self.aa()
                    || self.rd()
                    || self.ra()
                    || self.ad()
                    || self.cd()
                    || self.rcode() != 0
                {
                    return Err(Error::malformed(2, "mDNS query with reserved flags set"));
                }
            }
            Protocol::Dns => {}
        }

        Ok(true)
    }

    // =========================================================================
    // Extraction
    // =========================================================================

    /// Parses the question and record sections once, populating
    /// [`Packet::question`], [`Packet::answer`] and [`Packet::opt`].
    ///
    /// Idempotent: after the first success further calls return without
    /// touching the packet. The read cursor is preserved either way.
    pub fn extract(&mut self) -> Result<()> {
        if self.extracted {
            return Ok(());
        }

        let saved_rindex = self.rindex;
        self.rindex = HEADER_SIZE;
        let r = self.extract_inner();
        self.rindex = saved_rindex;
        r
    }

    fn extract_inner(&mut self) -> Result<()> {
        let mut question = Question::with_capacity(self.qdcount() as usize);
        for _ in 0..self.qdcount() {
            let (key, cache_flush) = self.read_key()?;

            if cache_flush {
                return Err(Error::malformed(
                    self.rindex,
                    "cache-flush bit in question section",
                ));
            }

            if !rtype::type_is_valid_query(key.rtype) {
                return Err(Error::malformed(self.rindex, "invalid question type"));
            }

            question.push(key);
        }

        let ancount = self.ancount() as usize;
        let nscount = self.nscount() as usize;
        let mut answer = Answer::with_capacity(self.rrcount());
        let mut opt: Option<ResourceRecord> = None;

        for i in 0..self.rrcount() {
            let (rr, cache_flush) = self.read_rr()?;

            if rr.key.rtype == RecordType::OPT.to_u16() {
                if !rr.key.is_root() {
                    return Err(Error::malformed(self.rindex, "OPT RR with non-root owner"));
                }

                // Only valid in the Additional section (RFC 6891 §6.1.1).
                if i < ancount + nscount {
                    debug!(index = i, "dropping packet with misplaced OPT RR");
                    return Err(Error::malformed(self.rindex, "OPT RR outside additional section"));
                }

                if opt.is_some() {
                    return Err(Error::malformed(self.rindex, "more than one OPT RR"));
                }

                opt = Some(rr);
            } else {
                // Only Answer-section records are cacheable; Authority and
                // Additional data merely supports them.
                let mut flags = AnswerFlags::empty();
                if i < ancount {
                    flags |= AnswerFlags::CACHEABLE;
                }
                if self.protocol == Protocol::Mdns && !cache_flush {
                    flags |= AnswerFlags::SHARED_OWNER;
                }

                answer.push(rr, self.ifindex, flags);
            }
        }

        trace!(
            protocol = %self.protocol,
            questions = question.len(),
            records = answer.len(),
            edns = opt.is_some(),
            "extracted packet"
        );

        self.question = Some(question);
        self.answer = Some(answer);
        self.opt = opt;
        self.extracted = true;
        Ok(())
    }

    /// Returns the extracted question list, if [`Packet::extract`] has run.
    #[inline]
    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    /// Returns the extracted answer list, if [`Packet::extract`] has run.
    #[inline]
    pub fn answer(&self) -> Option<&Answer> {
        self.answer.as_ref()
    }

    /// Returns the extracted OPT pseudo-record, if the packet carried one.
    #[inline]
    pub fn opt(&self) -> Option<&ResourceRecord> {
        self.opt.as_ref()
    }

    /// Returns the UDP payload size advertised in the OPT record.
    #[inline]
    pub fn edns_max_udp_size(&self) -> Option<u16> {
        self.opt.as_ref().map(|rr| rr.key.class)
    }

    /// Returns true if the packet's OPT record has the DNSSEC OK bit set
    /// (RFC 3225).
    #[inline]
    pub fn edns_do(&self) -> bool {
        self.opt
            .as_ref()
            .is_some_and(|rr| rr.ttl & u32::from(crate::packet::append::EDNS0_OPT_DO) != 0)
    }

    /// Checks whether this packet is a reply for `key`: a valid reply
    /// whose question section holds exactly that one key.
    pub fn is_reply_for(&mut self, key: &ResourceKey) -> Result<bool> {
        if !self.validate_reply()? {
            return Ok(false);
        }

        self.extract()?;

        let question = match &self.question {
            Some(q) if q.len() == 1 => q,
            _ => return Ok(false),
        };

        Ok(question.keys()[0].equal(key))
    }
}
