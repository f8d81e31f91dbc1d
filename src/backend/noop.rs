//! No-op backend registered under the reserved `test` type tag

use futures::future::{BoxFuture, FutureExt};
use tracing::info;

use super::{BackendResult, DatabaseBackend};

/// Backend that provisions nothing; used to exercise the controller
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBackend;

impl DatabaseBackend for NoopBackend {
    fn create<'a>(
        &'a self,
        name: &'a str,
        user: &'a str,
        _password: &'a str,
    ) -> BoxFuture<'a, BackendResult<()>> {
        async move {
            info!(database = %name, user = %user, "Creating no-op database");
            Ok(())
        }
        .boxed()
    }

    fn delete<'a>(&'a self, name: &'a str) -> BoxFuture<'a, BackendResult<()>> {
        async move {
            info!(database = %name, "Deleting no-op database");
            Ok(())
        }
        .boxed()
    }

    fn ping<'a>(&'a self, _name: &'a str, user: &'a str, _password: &'a str) -> BoxFuture<'a, bool> {
        let reachable = !user.is_empty();
        async move { reachable }.boxed()
    }
}
