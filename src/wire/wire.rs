use std::convert::TryFrom;
use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use kvstate::{Command, Operation, Value, NIL};

use super::errors::WireError;

/// Opcode preceding every client request.
pub const PROPOSE: u8 = 0;

/// Size of a propose frame, opcode included.
pub const PROPOSE_SIZE: usize = 1 + 4 + 1 + 8 + 8 + 8 + 8;

pub const REPLY_SIZE: usize = 1 + 4 + 8 + 8;

/// Propose asks a replica to commit and execute one command.
/// All integers are little endian.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Propose {
    pub command_id: i32,
    pub command: Command,
    pub old_value: Value,
    pub timestamp: i64,
}

impl Propose {
    pub fn new(command_id: i32, command: Command) -> Propose {
        Propose {
            command_id,
            command,
            old_value: NIL,
            timestamp: 0,
        }
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(PROPOSE_SIZE);
        dst.put_u8(PROPOSE);
        dst.put_i32_le(self.command_id);
        dst.put_u8(self.command.op as u8);
        dst.put_i64_le(self.command.key);
        dst.put_i64_le(self.command.value);
        dst.put_i64_le(self.old_value);
        dst.put_i64_le(self.timestamp);
    }

    /// decode reads one frame from a buffer holding at least PROPOSE_SIZE bytes.
    pub fn decode<B: Buf>(src: &mut B) -> Result<Propose, WireError> {
        let code = src.get_u8();
        if code != PROPOSE {
            return Err(WireError::BadOpcode(code));
        }

        let command_id = src.get_i32_le();
        let op = Operation::try_from(src.get_u8())?;
        let key = src.get_i64_le();
        let value = src.get_i64_le();

        Ok(Propose {
            command_id,
            command: Command::of(op, key, value),
            old_value: src.get_i64_le(),
            timestamp: src.get_i64_le(),
        })
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), WireError> {
        let mut buf = BytesMut::with_capacity(PROPOSE_SIZE);
        self.encode(&mut buf);
        w.write_all(&buf)?;
        w.flush()?;
        Ok(())
    }
}

/// ProposeReply is sent back once the command of `command_id` is executed.
/// `ok == 0` means the replica failed to handle it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ProposeReply {
    pub ok: u8,
    pub command_id: i32,
    pub value: Value,
    pub timestamp: i64,
}

impl ProposeReply {
    pub fn is_ok(&self) -> bool {
        self.ok != 0
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(REPLY_SIZE);
        dst.put_u8(self.ok);
        dst.put_i32_le(self.command_id);
        dst.put_i64_le(self.value);
        dst.put_i64_le(self.timestamp);
    }

    pub fn decode<B: Buf>(src: &mut B) -> ProposeReply {
        ProposeReply {
            ok: src.get_u8(),
            command_id: src.get_i32_le(),
            value: src.get_i64_le(),
            timestamp: src.get_i64_le(),
        }
    }

    /// read_from blocks until a whole reply is read.
    pub fn read_from<R: Read>(r: &mut R) -> Result<ProposeReply, WireError> {
        let mut buf = [0u8; REPLY_SIZE];
        r.read_exact(&mut buf)?;
        Ok(ProposeReply::decode(&mut &buf[..]))
    }
}

/// ProposeCodec is used by the client side to send `Propose` and by a replica to receive it.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProposeCodec;

impl Encoder<Propose> for ProposeCodec {
    type Error = WireError;

    fn encode(&mut self, item: Propose, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst);
        Ok(())
    }
}

impl Decoder for ProposeCodec {
    type Item = Propose;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < PROPOSE_SIZE {
            src.reserve(PROPOSE_SIZE - src.len());
            return Ok(None);
        }
        let mut frame = src.split_to(PROPOSE_SIZE);
        Propose::decode(&mut frame).map(Some)
    }
}

/// ReplyCodec is the counterpart of ProposeCodec for `ProposeReply`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReplyCodec;

impl Encoder<ProposeReply> for ReplyCodec {
    type Error = WireError;

    fn encode(&mut self, item: ProposeReply, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst);
        Ok(())
    }
}

impl Decoder for ReplyCodec {
    type Item = ProposeReply;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < REPLY_SIZE {
            src.reserve(REPLY_SIZE - src.len());
            return Ok(None);
        }
        let mut frame = src.split_to(REPLY_SIZE);
        Ok(Some(ProposeReply::decode(&mut frame)))
    }
}
