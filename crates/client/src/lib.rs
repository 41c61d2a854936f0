//! Remote job client for long-running inference requests.
//!
//! Submits a generation request to a remote HTTP service and polls it to a
//! terminal state under cancellation and an attempt budget. Two protocols
//! are supported behind the [`JobTransport`] trait (REST predictions and a
//! single task endpoint). The crate also provides the shared
//! [`HttpContext`] and the binary [`Uploader`] used to stage local
//! resources.

pub mod api;
pub mod config;
pub mod http;
pub mod job_client;
pub mod poll;
pub mod transport;
pub mod upload;
pub mod wire;

pub use api::{transport_from_config, PredictionApi, TaskApi};
pub use config::{ApiVariant, ClientConfig};
pub use http::HttpContext;
pub use job_client::JobClient;
pub use poll::{poll_until_terminal, PollConfig};
pub use transport::{JobTransport, SubmitReceipt, SubmitRequest};
pub use upload::{HttpUploader, Uploader};
