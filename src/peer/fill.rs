use std::fmt;
use std::mem;
use std::sync::{Arc, OnceLock};

use bytes::{BufMut, BytesMut};
use tracing::{debug, trace};

use super::message::{Message, MessageId};
use super::piece::{wire_length, BlockRegion};
use crate::constants::{BLOCK_HEADER_LEN, ID_LEN};

/// A PIECE message whose block bytes are still being written.
///
/// The fill exclusively owns the buffer. [`finish`](BlockFill::finish)
/// freezes it into an immutable [`Message`] and publishes that message to
/// every [`PendingMessage`] taken from this fill. Dropping a fill without
/// finishing it leaves those handles unready for good.
pub struct BlockFill {
    buf: BytesMut,
    region: BlockRegion,
    slot: Arc<OnceLock<Message>>,
    finished: bool,
}

impl BlockFill {
    pub(crate) fn new(index: i32, begin: i32, length: usize) -> Self {
        let mut buf = BytesMut::with_capacity(ID_LEN + BLOCK_HEADER_LEN + length);
        buf.put_u8(MessageId::Piece as u8);
        buf.put_i32(index);
        buf.put_i32(begin);
        buf.put_bytes(0, length);

        Self {
            buf,
            region: BlockRegion::new(index, begin, wire_length(length)),
            slot: Arc::default(),
            finished: false,
        }
    }

    pub fn region(&self) -> BlockRegion {
        self.region
    }

    /// The block bytes, zeroed at allocation.
    pub fn block_mut(&mut self) -> &mut [u8] {
        &mut self.buf[ID_LEN + BLOCK_HEADER_LEN..]
    }

    /// A handle for the consumer waiting on this block.
    pub fn pending(&self) -> PendingMessage {
        PendingMessage {
            slot: Arc::clone(&self.slot),
        }
    }

    /// Freezes the buffer and publishes the finished message.
    pub fn finish(mut self) -> Message {
        let message = Message::wrap(mem::take(&mut self.buf).freeze());
        self.finished = true;
        if self.slot.set(message.clone()).is_err() {
            unreachable!("block fill published twice");
        }
        trace!(region = %self.region, "block fill published");
        message
    }
}

impl Drop for BlockFill {
    fn drop(&mut self) {
        if !self.finished {
            debug!(region = %self.region, "block fill dropped before completion");
        }
    }
}

impl fmt::Debug for BlockFill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockFill")
            .field("region", &self.region)
            .finish()
    }
}

/// The consumer side of a block fill.
///
/// Polling never blocks or locks. Once [`is_ready`](PendingMessage::is_ready)
/// returns true the message bytes are complete and never change again.
#[derive(Clone)]
pub struct PendingMessage {
    slot: Arc<OnceLock<Message>>,
}

impl PendingMessage {
    pub fn is_ready(&self) -> bool {
        self.slot.get().is_some()
    }

    /// The published message, if the fill has finished.
    pub fn get(&self) -> Option<&Message> {
        self.slot.get()
    }

    /// Takes the published message, or hands the handle back if unready.
    pub fn into_message(self) -> Result<Message, Self> {
        match self.slot.get() {
            Some(message) => Ok(message.clone()),
            None => Err(self),
        }
    }
}

impl From<Message> for PendingMessage {
    fn from(message: Message) -> Self {
        Self {
            slot: Arc::new(OnceLock::from(message)),
        }
    }
}

impl fmt::Debug for PendingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingMessage")
            .field("message", &self.slot.get())
            .finish()
    }
}
