//! Interceptor chain wrapped around the transport call.
//!
//! # Design
//! Interceptors run in the order they were registered; each one wraps every
//! interceptor after it plus the transport. The chain is not a linked object
//! graph: `InvocationTarget` is a cursor over the remaining slice of
//! interceptors and a borrowed transport, and `proceed` advances the cursor by
//! one. Nothing is retried automatically; an interceptor that calls `proceed`
//! twice gets two transport calls.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, trace, warn};

use crate::error::Result;
use crate::http::Request;
use crate::response::RawResponse;
use crate::transport::Transport;

/// Wraps one request/response exchange.
///
/// Call `target.proceed(request)` to continue down the chain, or return a
/// response directly to short-circuit it.
pub trait Interceptor: Send + Sync {
    fn intercept(&self, target: &InvocationTarget<'_>, request: Request) -> Result<RawResponse>;
}

/// The rest of the chain as seen from one interceptor.
pub struct InvocationTarget<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    transport: &'a dyn Transport,
}

impl<'a> InvocationTarget<'a> {
    pub fn new(interceptors: &'a [Arc<dyn Interceptor>], transport: &'a dyn Transport) -> Self {
        Self {
            interceptors,
            transport,
        }
    }

    /// Number of interceptors still ahead of the transport.
    pub fn remaining(&self) -> usize {
        self.interceptors.len()
    }

    pub fn proceed(&self, request: Request) -> Result<RawResponse> {
        match self.interceptors.split_first() {
            Some((first, rest)) => {
                trace!(remaining = rest.len(), "entering interceptor");
                let next = InvocationTarget::new(rest, self.transport);
                first.intercept(&next, request)
            }
            None => self.transport.execute(request),
        }
    }
}

/// Adapter returned by [`from_fn`].
pub struct FnInterceptor<F>(F);

/// Turn a closure into an interceptor.
pub fn from_fn<F>(f: F) -> FnInterceptor<F>
where
    F: Fn(&InvocationTarget<'_>, Request) -> Result<RawResponse> + Send + Sync,
{
    FnInterceptor(f)
}

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(&InvocationTarget<'_>, Request) -> Result<RawResponse> + Send + Sync,
{
    fn intercept(&self, target: &InvocationTarget<'_>, request: Request) -> Result<RawResponse> {
        (self.0)(target, request)
    }
}

/// Logs the request line before proceeding and the status (or error) after.
#[derive(Debug, Clone, Default)]
pub struct LoggingInterceptor;

impl Interceptor for LoggingInterceptor {
    fn intercept(&self, target: &InvocationTarget<'_>, request: Request) -> Result<RawResponse> {
        let method = request.method;
        let url = request.full_url();
        info!(%method, %url, "request");

        let started = Instant::now();
        match target.proceed(request) {
            Ok(response) => {
                info!(
                    %method,
                    %url,
                    status = response.status_code(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "response"
                );
                Ok(response)
            }
            Err(err) => {
                warn!(%method, %url, error = %err, "request failed");
                Err(err)
            }
        }
    }
}
