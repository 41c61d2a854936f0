//! Local stand-in for the remote call.
//!
//! Synthesized URLs live under the reserved `.invalid` TLD so they can
//! never be mistaken for genuine results.

use std::time::Duration;

use genflow_core::{Dimensions, GenerationError, MediaKind};
use tokio_util::sync::CancellationToken;

pub const DRY_RUN_HOST: &str = "dry-run.genflow.invalid";

/// `https://dry-run.genflow.invalid/{kind}/{w}x{h}/{uuid}.{ext}`
pub fn synthesize_url(kind: MediaKind, dimensions: Dimensions) -> String {
    format!(
        "https://{DRY_RUN_HOST}/{kind}/{dimensions}/{}.{}",
        uuid::Uuid::new_v4(),
        kind.default_extension()
    )
}

pub fn is_dry_run_url(url: &str) -> bool {
    url.strip_prefix("https://")
        .and_then(|rest| rest.split('/').next())
        .is_some_and(|host| host == DRY_RUN_HOST)
}

/// Wait `delay`, then return a synthesized URL.
pub async fn run(
    kind: MediaKind,
    dimensions: Dimensions,
    delay: Duration,
    cancel: &CancellationToken,
) -> Result<String, GenerationError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GenerationError::Cancelled),
        _ = tokio::time::sleep(delay) => {
            let url = synthesize_url(kind, dimensions);
            tracing::info!(url = %url, "Dry run produced synthetic result");
            Ok(url)
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn synthesized_url_encodes_kind_and_size() {
        let url = synthesize_url(MediaKind::Video, Dimensions::new(640, 360));
        assert!(url.starts_with("https://dry-run.genflow.invalid/video/640x360/"));
        assert!(url.ends_with(".mp4"));
        assert!(is_dry_run_url(&url));
        assert!(!is_dry_run_url("https://cdn.example/x.png"));
    }

    #[test]
    fn synthesized_urls_are_unique() {
        let dims = Dimensions::default();
        assert_ne!(synthesize_url(MediaKind::Image, dims), synthesize_url(MediaKind::Image, dims));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_the_configured_delay() {
        let start = tokio::time::Instant::now();
        let cancel = CancellationToken::new();
        run(MediaKind::Image, Dimensions::default(), Duration::from_millis(1500), &cancel)
            .await
            .unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_delay() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let result =
            run(MediaKind::Image, Dimensions::default(), Duration::from_secs(60), &cancel).await;
        assert_matches!(result, Err(GenerationError::Cancelled));
    }
}
