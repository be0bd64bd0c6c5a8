use crate::{ExportCommand, ExportUpdate};
use pdf_overlay::{DocumentId, DocumentStore, ExportOptions, ExportPipeline, record_form_values};
use std::collections::VecDeque;
use tokio::sync::mpsc;

/// Async worker task that processes export commands and sends updates.
///
/// Commands run one at a time, in order. An export is dropped when a newer
/// export of the same document is already queued behind it. Returns on
/// `Shutdown` or when every sender is gone.
pub async fn worker_task<S: DocumentStore>(
    pipeline: ExportPipeline<S>,
    mut command_rx: mpsc::UnboundedReceiver<ExportCommand>,
    update_tx: mpsc::UnboundedSender<ExportUpdate>,
) {
    let mut pending = VecDeque::new();

    loop {
        let cmd = match pending.pop_front() {
            Some(cmd) => cmd,
            None => match command_rx.recv().await {
                Some(cmd) => cmd,
                None => break,
            },
        };

        match cmd {
            ExportCommand::Export { doc_id, options } => {
                // Pull in everything queued so far to look for a newer request
                while let Ok(next_cmd) = command_rx.try_recv() {
                    pending.push_back(next_cmd);
                }
                let superseded = pending.iter().any(|queued| {
                    matches!(queued, ExportCommand::Export { doc_id: newer, .. } if *newer == doc_id)
                });
                if superseded {
                    log::debug!("Discarding queued export of {doc_id}, a newer request follows");
                    continue;
                }
                handle_export(&pipeline, doc_id, options, &update_tx).await;
            }
            ExportCommand::RecordFormValues { doc_id, values } => {
                let update = match record_form_values(pipeline.store().as_ref(), &doc_id, values).await {
                    Ok(()) => ExportUpdate::ValuesRecorded { doc_id },
                    Err(e) => ExportUpdate::Failed {
                        doc_id,
                        stage: None,
                        message: format!("Failed to record form values: {}", e),
                    },
                };
                let _ = update_tx.send(update);
            }
            ExportCommand::Shutdown => {
                log::debug!("Export worker shutting down");
                break;
            }
        }
    }
}

async fn handle_export<S: DocumentStore>(
    pipeline: &ExportPipeline<S>,
    doc_id: DocumentId,
    options: Option<ExportOptions>,
    update_tx: &mpsc::UnboundedSender<ExportUpdate>,
) {
    let _ = update_tx.send(ExportUpdate::Started {
        doc_id: doc_id.clone(),
    });

    let result = match &options {
        Some(options) => pipeline.export_with(&doc_id, options).await,
        None => pipeline.export(&doc_id).await,
    };

    let update = match result {
        Ok(artifact) => ExportUpdate::Completed {
            doc_id,
            artifact: Box::new(artifact),
        },
        Err(e) => {
            log::warn!("{e}");
            ExportUpdate::Failed {
                doc_id,
                stage: Some(e.stage),
                message: e.to_string(),
            }
        }
    };
    let _ = update_tx.send(update);
}
