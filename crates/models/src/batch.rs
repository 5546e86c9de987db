use serde::{Deserialize, Serialize};

/// The recipient of an alert email, as resolved for a single alert.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRecipient {
    /// Address to deliver to. `None` means the alert can't be delivered.
    pub email: Option<String>,
    /// Name to greet the recipient with, if the identity provider knows it.
    pub display_name: Option<String>,
}

/// Summary of one invocation of the batch pipeline, returned to whichever
/// ingress triggered it.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub processed: u32,
    pub successful: u32,
    pub failed: u32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchResult {
    /// A batch which found nothing to do.
    pub fn empty() -> BatchResult {
        BatchResult {
            message: "No pending alerts to process".to_string(),
            ..Default::default()
        }
    }

    /// Builds the result of a batch which ran to completion. Counts are
    /// reconciled so that `successful + failed` never exceeds `processed`.
    pub fn completed(processed: u32, successful: u32, failed: u32) -> BatchResult {
        let successful = successful.min(processed);
        let failed = failed.min(processed - successful);
        BatchResult {
            processed,
            successful,
            failed,
            message: format!(
                "Processed {processed} alerts: {successful} sent, {failed} failed"
            ),
            error: None,
        }
    }

    /// Builds the result of a batch which was aborted by `error`.
    pub fn aborted(processed: u32, successful: u32, error: String) -> BatchResult {
        let successful = successful.min(processed);
        BatchResult {
            processed,
            successful,
            failed: processed - successful,
            message: "Batch processing failed".to_string(),
            error: Some(error),
        }
    }
}
