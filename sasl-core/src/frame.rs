//! The SASL frame union and the dispatcher seam that serializes it onto
//! the wire.
//!
//! `spec.md` §1 puts the AMQP frame codec itself — `post_frame`,
//! `dispatcher_input`, `dispatcher_output`, and the composite-type
//! grammar behind them — out of scope: it is an external collaborator
//! the core calls through [`FrameDispatcher`]. [`AmqpFrameDispatcher`] is
//! the one concrete implementation shipped here so the crate is usable
//! and testable end to end; a real transport is free to supply its own.

use sasl_types::{SaslChallenge, SaslInit, SaslMechanisms, SaslOutcome, SaslResponse};
use serde::{
    de::{self, VariantAccess},
    ser, Deserialize, Serialize,
};

/// One of the five SASL frame bodies (`spec.md` §6).
#[derive(Debug, Clone)]
pub enum Frame {
    /// `SASL-MECHANISMS`
    Mechanisms(SaslMechanisms),
    /// `SASL-INIT`
    Init(SaslInit),
    /// `SASL-CHALLENGE`
    Challenge(SaslChallenge),
    /// `SASL-RESPONSE`
    Response(SaslResponse),
    /// `SASL-OUTCOME`
    Outcome(SaslOutcome),
}

/// Error raised while framing or de-framing a [`Frame`] on the wire.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The frame body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// The frame type byte did not identify a SASL frame.
    #[error("not a SASL frame")]
    NotSasl,
}

/// The out-of-scope external collaborator: encodes [`Frame`] values onto
/// the wire and decodes them back off of it. `spec.md` names this
/// collaborator's operations `post_frame`, `dispatcher_input`, and
/// `dispatcher_output`.
pub trait FrameDispatcher: std::fmt::Debug {
    /// Queues `frame` to be drained by a later [`FrameDispatcher::dispatcher_output`] call.
    fn post_frame(&mut self, frame: Frame) -> Result<(), DispatchError>;

    /// Serializes as many queued frames as fit into `buf`, returning the
    /// number of bytes written. Returns `0` when nothing is queued.
    fn dispatcher_output(&mut self, buf: &mut Vec<u8>) -> Result<usize, DispatchError>;

    /// Feeds `bytes` in; returns the number of bytes consumed and a
    /// decoded [`Frame`] if a complete one was available. `(0, None)`
    /// means more bytes are needed.
    fn dispatcher_input(&mut self, bytes: &[u8]) -> Result<(usize, Option<Frame>), DispatchError>;
}

const FRAME_TYPE_SASL: u8 = 1;

/// Reference [`FrameDispatcher`]: a 4-byte length-prefixed AMQP frame
/// header (doff = 2, type = SASL) wrapping a `serde_amqp`-encoded
/// composite body, mirroring the wire layout AMQP 1.0 §2.3 mandates for
/// SASL frames.
#[derive(Debug, Default)]
pub struct AmqpFrameDispatcher {
    outbox: std::collections::VecDeque<Frame>,
}

impl AmqpFrameDispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameDispatcher for AmqpFrameDispatcher {
    fn post_frame(&mut self, frame: Frame) -> Result<(), DispatchError> {
        self.outbox.push_back(frame);
        Ok(())
    }

    fn dispatcher_output(&mut self, buf: &mut Vec<u8>) -> Result<usize, DispatchError> {
        let mut written = 0;
        while let Some(frame) = self.outbox.pop_front() {
            let body = serde_amqp::to_vec(&frame).map_err(|e| DispatchError::Decode(e.to_string()))?;

            let size = (body.len() + 8) as u32;
            let mut out = Vec::with_capacity(body.len() + 8);
            out.extend_from_slice(&size.to_be_bytes());
            out.push(2); // doff
            out.push(FRAME_TYPE_SASL);
            out.extend_from_slice(&[0u8, 0u8]); // channel, ignored for SASL frames
            out.extend_from_slice(&body);

            written += out.len();
            buf.extend_from_slice(&out);
        }
        Ok(written)
    }

    fn dispatcher_input(&mut self, bytes: &[u8]) -> Result<(usize, Option<Frame>), DispatchError> {
        if bytes.len() < 8 {
            return Ok((0, None));
        }
        let size = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        if bytes.len() < size {
            return Ok((0, None));
        }
        let doff = bytes[4];
        let ftype = bytes[5];
        if ftype != FRAME_TYPE_SASL {
            return Err(DispatchError::NotSasl);
        }
        let body_offset = (doff as usize) * 4;
        if body_offset > size {
            return Err(DispatchError::Decode("doff exceeds frame size".to_string()));
        }
        let body = &bytes[body_offset..size];
        let frame: Frame =
            serde_amqp::from_slice(body).map_err(|e| DispatchError::Decode(e.to_string()))?;
        Ok((size, Some(frame)))
    }
}

impl ser::Serialize for Frame {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Frame::Mechanisms(value) => value.serialize(serializer),
            Frame::Init(value) => value.serialize(serializer),
            Frame::Challenge(value) => value.serialize(serializer),
            Frame::Response(value) => value.serialize(serializer),
            Frame::Outcome(value) => value.serialize(serializer),
        }
    }
}

enum Field {
    Mechanisms,
    Init,
    Challenge,
    Response,
    Outcome,
}

struct FieldVisitor;

impl<'de> de::Visitor<'de> for FieldVisitor {
    type Value = Field;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("SASL frame body descriptor")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let val = match v {
            "amqp:sasl-mechanisms:list" => Field::Mechanisms,
            "amqp:sasl-init:list" => Field::Init,
            "amqp:sasl-challenge:list" => Field::Challenge,
            "amqp:sasl-response:list" => Field::Response,
            "amqp:sasl-outcome:list" => Field::Outcome,
            _ => return Err(de::Error::custom("unrecognized SASL frame descriptor name")),
        };
        Ok(val)
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let val = match v {
            0x0000_0000_0000_0040 => Field::Mechanisms,
            0x0000_0000_0000_0041 => Field::Init,
            0x0000_0000_0000_0042 => Field::Challenge,
            0x0000_0000_0000_0043 => Field::Response,
            0x0000_0000_0000_0044 => Field::Outcome,
            _ => return Err(de::Error::custom("unrecognized SASL frame descriptor code")),
        };
        Ok(val)
    }
}

impl<'de> de::Deserialize<'de> for Field {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_identifier(FieldVisitor)
    }
}

struct FrameVisitor;

impl<'de> de::Visitor<'de> for FrameVisitor {
    type Value = Frame;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("enum Frame")
    }

    fn visit_enum<A>(self, data: A) -> Result<Self::Value, A::Error>
    where
        A: de::EnumAccess<'de>,
    {
        let (field, variant) = data.variant()?;
        match field {
            Field::Mechanisms => Ok(Frame::Mechanisms(variant.newtype_variant()?)),
            Field::Init => Ok(Frame::Init(variant.newtype_variant()?)),
            Field::Challenge => Ok(Frame::Challenge(variant.newtype_variant()?)),
            Field::Response => Ok(Frame::Response(variant.newtype_variant()?)),
            Field::Outcome => Ok(Frame::Outcome(variant.newtype_variant()?)),
        }
    }
}

impl<'de> de::Deserialize<'de> for Frame {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        const VARIANTS: &[&str] = &[
            "amqp:sasl-mechanisms:list",
            "amqp:sasl-init:list",
            "amqp:sasl-challenge:list",
            "amqp:sasl-response:list",
            "amqp:sasl-outcome:list",
        ];
        deserializer.deserialize_enum("Frame", VARIANTS, FrameVisitor)
    }
}
