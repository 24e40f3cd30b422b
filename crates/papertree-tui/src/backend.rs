use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use papertree_core::{ResearchClient, SearchRequest};

use crate::tui_event::BackendEvent;

/// Stream one search, forwarding every record to the TUI.
///
/// The app owns the engine; this task only moves decoded records across the
/// channel, tagged with `generation`. Unbounded so the synchronous record
/// callback never has to wait.
pub async fn run_search(
    client: ResearchClient,
    request: SearchRequest,
    generation: u64,
    tx: mpsc::UnboundedSender<BackendEvent>,
    cancel: CancellationToken,
) {
    let records = tx.clone();
    let result = client
        .search(&request, &cancel, move |item| {
            let _ = records.send(BackendEvent::Record { generation, item });
        })
        .await
        .map_err(|e| e.to_string());

    if let Err(err) = &result {
        log::warn!("search {generation} failed: {err}");
    }
    let _ = tx.send(BackendEvent::Finished { generation, result });
}

#[cfg(test)]
mod tests {
    use papertree_core::Config;

    use super::*;

    #[tokio::test]
    async fn cancelled_search_reports_finished() {
        let config = Config {
            api_url: "http://127.0.0.1:9".into(),
            ..Config::default()
        };
        let client = ResearchClient::new(&config).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        cancel.cancel();

        run_search(client, config.search_request("q"), 7, tx, cancel).await;

        match rx.recv().await {
            Some(BackendEvent::Finished { generation, result }) => {
                assert_eq!(generation, 7);
                assert_eq!(result, Ok(papertree_core::StreamOutcome::Cancelled));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(rx.recv().await.is_none());
    }
}
