use anyhow::anyhow;
use common::{AccountStats, Contest, LedgerError, MatchType, Wager};
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::ledger::{Ledger, Registration};
use crate::random::RandomSource;
use crate::settlement::SettlementReport;
use crate::store::StoreError;

pub type Responder<T> = oneshot::Sender<T>;

pub enum LedgerRequest {
    Register {
        name: String,
        responder: Responder<Result<Registration, LedgerError>>,
    },
    StartContest {
        mode: Option<MatchType>,
        contestants: Vec<String>,
        responder: Responder<Result<Contest, LedgerError>>,
    },
    PlaceWager {
        account: String,
        contestant: String,
        amount: i64,
        responder: Responder<Result<Wager, LedgerError>>,
    },
    Settle {
        winner: String,
        responder: Responder<Result<SettlementReport, LedgerError>>,
    },
    Save {
        responder: Responder<Result<(), StoreError>>,
    },
    Reload {
        responder: Responder<Result<usize, StoreError>>,
    },
    GetStats {
        name: String,
        responder: Responder<Option<AccountStats>>,
    },
    GetAllStats {
        responder: Responder<Vec<AccountStats>>,
    },
    GetContest {
        responder: Responder<Option<Contest>>,
    },
    GetWagers {
        responder: Responder<Vec<Wager>>,
    },
    GetDataFile {
        responder: Responder<PathBuf>,
    },
}

/// Sole owner of the ledger. Requests are answered strictly one at a time.
pub struct LedgerManager<R> {
    ledger: Ledger<R>,
    work_queue: mpsc::Receiver<LedgerRequest>,
}

impl<R: RandomSource> LedgerManager<R> {
    pub fn new(ledger: Ledger<R>, work_queue: mpsc::Receiver<LedgerRequest>) -> Self {
        Self { ledger, work_queue }
    }

    /// Runs until every `LedgerHandle` has been dropped, then hands the
    /// ledger back.
    pub async fn manage(mut self) -> Ledger<R> {
        while let Some(request) = self.work_queue.recv().await {
            self.handle(request);
        }
        debug!("ledger request queue closed");
        self.ledger
    }

    // a caller that stopped waiting for its answer is not our problem
    fn handle(&mut self, request: LedgerRequest) {
        let ledger = &mut self.ledger;
        match request {
            LedgerRequest::Register { name, responder } => {
                let _ = responder.send(ledger.register(&name));
            }
            LedgerRequest::StartContest {
                mode,
                contestants,
                responder,
            } => {
                let resp = ledger.start_contest(mode, contestants).cloned();
                let _ = responder.send(resp);
            }
            LedgerRequest::PlaceWager {
                account,
                contestant,
                amount,
                responder,
            } => {
                let resp = ledger.place_wager(&account, &contestant, amount).cloned();
                let _ = responder.send(resp);
            }
            LedgerRequest::Settle { winner, responder } => {
                let _ = responder.send(ledger.settle(&winner));
            }
            LedgerRequest::Save { responder } => {
                let _ = responder.send(ledger.save_snapshot());
            }
            LedgerRequest::Reload { responder } => {
                let _ = responder.send(ledger.load_snapshot());
            }
            LedgerRequest::GetStats { name, responder } => {
                let _ = responder.send(ledger.stats(&name));
            }
            LedgerRequest::GetAllStats { responder } => {
                let _ = responder.send(ledger.all_stats());
            }
            LedgerRequest::GetContest { responder } => {
                let _ = responder.send(ledger.contest().cloned());
            }
            LedgerRequest::GetWagers { responder } => {
                let _ = responder.send(ledger.wagers().cloned().collect());
            }
            LedgerRequest::GetDataFile { responder } => {
                let _ = responder.send(ledger.data_file().to_path_buf());
            }
        }
    }
}

/// Spawns nothing; pair the manager with `tokio::spawn` or drive it inline.
pub fn channel<R: RandomSource>(
    ledger: Ledger<R>,
    capacity: usize,
) -> (LedgerHandle, LedgerManager<R>) {
    let (tx, rx) = mpsc::channel(capacity);
    (LedgerHandle { requester: tx }, LedgerManager::new(ledger, rx))
}

/// Cloneable front door to a running `LedgerManager`.
///
/// Ledger refusals surface as `LedgerError` inside the `anyhow::Error`, so
/// callers can `downcast_ref` when they care which check failed.
#[derive(Clone)]
pub struct LedgerHandle {
    requester: mpsc::Sender<LedgerRequest>,
}

impl LedgerHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(Responder<T>) -> LedgerRequest,
    ) -> anyhow::Result<T> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.requester
            .send(build(resp_tx))
            .await
            .map_err(|_| anyhow!("ledger manager has shut down"))?;
        Ok(resp_rx.await?)
    }

    pub async fn register(&self, name: impl Into<String>) -> anyhow::Result<Registration> {
        let name = name.into();
        Ok(self
            .request(|responder| LedgerRequest::Register { name, responder })
            .await??)
    }

    pub async fn start_contest(
        &self,
        mode: Option<MatchType>,
        contestants: Vec<String>,
    ) -> anyhow::Result<Contest> {
        Ok(self
            .request(|responder| LedgerRequest::StartContest {
                mode,
                contestants,
                responder,
            })
            .await??)
    }

    pub async fn place_wager(
        &self,
        account: impl Into<String>,
        contestant: impl Into<String>,
        amount: i64,
    ) -> anyhow::Result<Wager> {
        let (account, contestant) = (account.into(), contestant.into());
        Ok(self
            .request(|responder| LedgerRequest::PlaceWager {
                account,
                contestant,
                amount,
                responder,
            })
            .await??)
    }

    pub async fn settle(&self, winner: impl Into<String>) -> anyhow::Result<SettlementReport> {
        let winner = winner.into();
        Ok(self
            .request(|responder| LedgerRequest::Settle { winner, responder })
            .await??)
    }

    pub async fn save(&self) -> anyhow::Result<()> {
        Ok(self
            .request(|responder| LedgerRequest::Save { responder })
            .await??)
    }

    pub async fn reload(&self) -> anyhow::Result<usize> {
        Ok(self
            .request(|responder| LedgerRequest::Reload { responder })
            .await??)
    }

    pub async fn stats(&self, name: impl Into<String>) -> anyhow::Result<Option<AccountStats>> {
        let name = name.into();
        self.request(|responder| LedgerRequest::GetStats { name, responder })
            .await
    }

    pub async fn all_stats(&self) -> anyhow::Result<Vec<AccountStats>> {
        self.request(|responder| LedgerRequest::GetAllStats { responder })
            .await
    }

    pub async fn contest(&self) -> anyhow::Result<Option<Contest>> {
        self.request(|responder| LedgerRequest::GetContest { responder })
            .await
    }

    pub async fn wagers(&self) -> anyhow::Result<Vec<Wager>> {
        self.request(|responder| LedgerRequest::GetWagers { responder })
            .await
    }

    pub async fn data_file(&self) -> anyhow::Result<PathBuf> {
        self.request(|responder| LedgerRequest::GetDataFile { responder })
            .await
    }
}
