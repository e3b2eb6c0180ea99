use std::future::Future;
use tokio::task::JoinHandle;

use crate::core::diag;

/// Runs the task built by `make` until it returns normally.
///
/// A panic is reported on the side channel; with `restart` a fresh instance is
/// started, otherwise the task stays down.
pub(crate) fn supervise<F, Fut>(name: &'static str, restart: bool, mut make: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match tokio::spawn(make()).await {
                Ok(()) => break,
                Err(e) if e.is_panic() => {
                    let text = panic_text(e.into_panic());
                    diag::report(format_args!("FATAL: logger {} panicked: {}", name, text));
                    if !restart {
                        break;
                    }
                    diag::report(format_args!("restarting logger {}", name));
                }
                Err(_) => break,
            }
        }
    })
}

fn panic_text(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
