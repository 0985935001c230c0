// Copyright 2026 the Framesync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, each prefixed by a one-byte
//! tag. [`decode`] reads them back as an iterator of [`RecordedEvent`].
//! Decoding stops at the first unknown tag or truncated record.

use framesync_core::client::{FrameControl, SyncId};
use framesync_core::coordinator::DispatchSummary;
use framesync_core::rate::RateRange;
use framesync_core::time::{Duration, HostTime};
use framesync_core::trace::{
    ClientFrameEvent, EvictEvent, EvictReason, RateRangeEvent, TraceSink, VsyncEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_VSYNC: u8 = 1;
const TAG_CLIENT_FRAME: u8 = 2;
const TAG_EVICT: u8 = 3;
const TAG_DISPATCH: u8 = 4;
const TAG_RATE_RANGE: u8 = 5;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_range(&mut self, r: RateRange) {
        self.write_u32(r.min);
        self.write_u32(r.max);
        self.write_u32(r.preferred);
    }

    fn write_control(&mut self, c: FrameControl) {
        self.write_u8(match c {
            FrameControl::Continue => 0,
            FrameControl::Stop => 1,
        });
    }

    fn write_reason(&mut self, r: EvictReason) {
        self.write_u8(match r {
            EvictReason::Expired => 0,
            EvictReason::Stopped => 1,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_vsync(&mut self, e: &VsyncEvent) {
        self.write_u8(TAG_VSYNC);
        self.write_u64(e.timestamp.nanos());
        self.write_u64(e.period.nanos());
        self.write_u32(e.source_rate);
        self.write_bool(e.period_changed);
    }

    fn on_client_frame(&mut self, e: &ClientFrameEvent) {
        self.write_u8(TAG_CLIENT_FRAME);
        self.write_u64(e.id.0);
        self.write_u64(e.timestamp.nanos());
        self.write_bool(e.skipped);
        self.write_control(e.control);
    }

    fn on_evict(&mut self, e: &EvictEvent) {
        self.write_u8(TAG_EVICT);
        self.write_u64(e.id.0);
        self.write_u64(e.timestamp.nanos());
        self.write_reason(e.reason);
    }

    fn on_dispatch(&mut self, s: &DispatchSummary) {
        self.write_u8(TAG_DISPATCH);
        self.write_u64(s.timestamp.nanos());
        self.write_u32(s.ticked);
        self.write_u32(s.skipped);
        self.write_u32(s.evicted);
        self.write_u32(s.stopped);
        self.write_range(s.aggregate);
    }

    fn on_rate_range(&mut self, e: &RateRangeEvent) {
        self.write_u8(TAG_RATE_RANGE);
        self.write_u64(e.id.0);
        self.write_range(e.range);
        self.write_bool(e.merged);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// A [`VsyncEvent`].
    Vsync(VsyncEvent),
    /// A [`ClientFrameEvent`].
    ClientFrame(ClientFrameEvent),
    /// An [`EvictEvent`].
    Evict(EvictEvent),
    /// A [`DispatchSummary`].
    Dispatch(DispatchSummary),
    /// A [`RateRangeEvent`].
    RateRange(RateRangeEvent),
}

impl RecordedEvent {
    /// The vsync timestamp carried by the event, if any.
    #[must_use]
    pub fn timestamp(&self) -> Option<HostTime> {
        match self {
            Self::Vsync(e) => Some(e.timestamp),
            Self::ClientFrame(e) => Some(e.timestamp),
            Self::Evict(e) => Some(e.timestamp),
            Self::Dispatch(s) => Some(s.timestamp),
            Self::RateRange(_) => None,
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_range(&mut self) -> Option<RateRange> {
        Some(RateRange {
            min: self.read_u32()?,
            max: self.read_u32()?,
            preferred: self.read_u32()?,
        })
    }

    fn read_control(&mut self) -> Option<FrameControl> {
        Some(match self.read_u8()? {
            0 => FrameControl::Continue,
            _ => FrameControl::Stop,
        })
    }

    fn read_reason(&mut self) -> Option<EvictReason> {
        Some(match self.read_u8()? {
            0 => EvictReason::Expired,
            _ => EvictReason::Stopped,
        })
    }

    fn decode_vsync(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Vsync(VsyncEvent {
            timestamp: HostTime(self.read_u64()?),
            period: Duration(self.read_u64()?),
            source_rate: self.read_u32()?,
            period_changed: self.read_bool()?,
        }))
    }

    fn decode_client_frame(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ClientFrame(ClientFrameEvent {
            id: SyncId(self.read_u64()?),
            timestamp: HostTime(self.read_u64()?),
            skipped: self.read_bool()?,
            control: self.read_control()?,
        }))
    }

    fn decode_evict(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Evict(EvictEvent {
            id: SyncId(self.read_u64()?),
            timestamp: HostTime(self.read_u64()?),
            reason: self.read_reason()?,
        }))
    }

    fn decode_dispatch(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Dispatch(DispatchSummary {
            timestamp: HostTime(self.read_u64()?),
            ticked: self.read_u32()?,
            skipped: self.read_u32()?,
            evicted: self.read_u32()?,
            stopped: self.read_u32()?,
            aggregate: self.read_range()?,
        }))
    }

    fn decode_rate_range(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RateRange(RateRangeEvent {
            id: SyncId(self.read_u64()?),
            range: self.read_range()?,
            merged: self.read_bool()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_VSYNC => self.decode_vsync(),
            TAG_CLIENT_FRAME => self.decode_client_frame(),
            TAG_EVICT => self.decode_evict(),
            TAG_DISPATCH => self.decode_dispatch(),
            TAG_RATE_RANGE => self.decode_rate_range(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
