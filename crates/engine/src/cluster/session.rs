//! Authenticated session with a store node
//!
//! Every handle derived from a `Cluster` shares one `Arc<Session>`. The
//! session is released exactly once: on `Cluster::disconnect`, or when the
//! last handle drops, whichever comes first.

use crate::filter::pool::WorkerPools;
use crate::query::{QueryOptions, RowStream};
use crate::server::StoreServer;
use docmeta_core::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub(crate) struct Session {
    id: Uuid,
    user: String,
    node: Arc<StoreServer>,
    released: AtomicBool,
    pools: WorkerPools,
}

impl Session {
    /// Authenticate against `node` and open a session
    pub(crate) fn open(node: Arc<StoreServer>, user: &str, password: &str) -> Result<Self> {
        node.authenticate(user, password)?;
        node.open_session();
        let session = Session {
            id: Uuid::new_v4(),
            user: user.to_string(),
            node,
            released: AtomicBool::new(false),
            pools: WorkerPools::default(),
        };
        tracing::debug!(
            target: "docmeta::session",
            session = %session.id,
            user = %session.user,
            address = %session.node.address(),
            "session acquired"
        );
        Ok(session)
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn node(&self) -> &Arc<StoreServer> {
        &self.node
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// The node, if this session can still issue requests
    pub(crate) fn check(&self) -> Result<&StoreServer> {
        if self.is_released() {
            return Err(Error::unavailable(self.node.address(), "session released"));
        }
        if !self.node.is_online() {
            return Err(Error::unavailable(self.node.address(), "node is offline"));
        }
        Ok(&self.node)
    }

    /// Filter worker pools shared by every handle of this session
    pub(crate) fn pools(&self) -> &WorkerPools {
        &self.pools
    }

    pub(crate) fn query(&self, statement: &str, options: &QueryOptions) -> Result<RowStream> {
        self.check()?.execute_query(statement, options)
    }

    /// Release the session; later calls are no-ops
    pub(crate) fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.node.close_session();
        tracing::debug!(
            target: "docmeta::session",
            session = %self.id,
            address = %self.node.address(),
            "session released"
        );
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}
