//! Fragment-to-frame transcoding for incremental delivery.
//!
//! Every frame stream ends with exactly one [`Frame::End`], whether the fragment source finished,
//! failed mid-way, or had nothing to say. Dropping the frame stream drops the source with it.

use std::pin::Pin;

use futures::{Stream, StreamExt, stream};

use crate::FragmentSource;

pub const DONE_SENTINEL: &str = "[DONE]";

pub type FrameStream = Pin<Box<dyn Stream<Item = Frame> + Send>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
	Fragment(String),
	End,
}
impl Frame {
	/// Payload of the event-stream `data` field.
	pub fn data(&self) -> String {
		match self {
			Self::Fragment(text) => serde_json::json!({ "content": text }).to_string(),
			Self::End => DONE_SENTINEL.to_string(),
		}
	}

	/// Wire form of one event, including the blank line that terminates it.
	pub fn encode(&self) -> String {
		format!("data: {}\n\n", self.data())
	}

	pub fn is_end(&self) -> bool {
		matches!(self, Self::End)
	}
}

pub fn transcode(source: Box<dyn FragmentSource>) -> FrameStream {
	stream::unfold(Some(source), |state| async move {
		let mut source = state?;

		match source.next_fragment().await {
			Some(Ok(text)) => Some((Frame::Fragment(text), Some(source))),
			Some(Err(err)) => {
				tracing::warn!(error = %err, "Fragment source failed mid-stream.");

				Some((Frame::End, None))
			},
			None => Some((Frame::End, None)),
		}
	})
	.boxed()
}

/// A complete answer delivered as one fragment.
pub fn single(text: impl Into<String>) -> FrameStream {
	stream::iter([Frame::Fragment(text.into()), Frame::End]).boxed()
}
