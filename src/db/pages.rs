//! Keyset pagination over the `finance` table.

use super::{Db, FinanceRow};
use crate::error::Res;
use crate::model::Transaction;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_stream::Stream;
use tracing::trace;

type PageFuture = Pin<Box<dyn Future<Output = Res<Vec<FinanceRow>>> + Send>>;

/// A `Stream` of ledger rows that fetches `page_size` rows at a time, starting after the last id
/// it has seen. Nothing is read until the stream is first polled, and the pool connection is only
/// held while a page is being fetched.
pub(super) struct LedgerPages {
    db: Db,
    page_size: u32,
    after: i64,
    buffered: VecDeque<FinanceRow>,
    fetching: Option<PageFuture>,
    exhausted: bool,
}

impl LedgerPages {
    pub(super) fn new(db: Db, page_size: u32) -> Self {
        Self {
            db,
            page_size: page_size.max(1),
            after: 0,
            buffered: VecDeque::new(),
            fetching: None,
            exhausted: false,
        }
    }

    fn fetch_next_page(&self) -> PageFuture {
        let db = self.db.clone();
        let (after, limit) = (self.after, self.page_size);
        trace!("Fetching up to {limit} finance rows after id {after}");
        Box::pin(async move { db.ledger_page(after, limit).await })
    }
}

impl Stream for LedgerPages {
    type Item = Res<Transaction>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(row) = this.buffered.pop_front() {
                return Poll::Ready(Some(Transaction::try_from(row)));
            }
            if this.exhausted {
                return Poll::Ready(None);
            }

            let mut fetching = match this.fetching.take() {
                Some(fetching) => fetching,
                None => this.fetch_next_page(),
            };
            match fetching.as_mut().poll(cx) {
                Poll::Pending => {
                    this.fetching = Some(fetching);
                    return Poll::Pending;
                }
                Poll::Ready(Err(e)) => {
                    this.exhausted = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(Ok(rows)) => {
                    // A short page is the last one
                    if rows.len() < this.page_size as usize {
                        this.exhausted = true;
                    }
                    if let Some(last) = rows.last() {
                        this.after = last.id;
                    }
                    this.buffered.extend(rows);
                }
            }
        }
    }
}
