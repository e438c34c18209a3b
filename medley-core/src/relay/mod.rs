//! Dispatch & streaming relay
//!
//! Fans one canonical request out to the selected providers, one tokio
//! task per (turn, provider), and relays each provider's stream to the
//! shared client channel as fragments arrive. Tasks share nothing but the
//! outbound `mpsc::Sender<Frame>`, which serializes frame writes; every
//! other piece of state is exclusively owned by its task until it is
//! published in the returned outcome. One provider's failure never aborts
//! its siblings.

pub mod frame;
pub mod handle;

pub use frame::{DoneMeta, Frame, FrameEvent};
pub use handle::{StreamHandle, StreamState};

use crate::blocks::{decompose, IncrementalDecomposer, ResponseBlock};
use crate::config::SecretString;
use crate::estimate::{
    compute_output_cap, estimate_request_tokens, estimate_tokens, PriceTable, TokenizerFamily,
};
use crate::http::HttpClient;
use crate::protocol::ChatRequest;
use crate::providers::{
    resolve_model, ProviderDescriptor, ProviderRegistry, RelayError, RetryPolicy, WireAdapter,
};
use eventsource_stream::Eventsource;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of one provider's unit of work
#[derive(Debug, Clone)]
pub struct ProviderOutcome {
    /// Terminal stream state and timing
    pub handle: StreamHandle,

    /// Final decomposed blocks; empty unless the stream completed
    pub blocks: Vec<ResponseBlock>,
}

/// Options governing one dispatch
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Per-provider retry policy
    pub retry: RetryPolicy,

    /// Upper bound on one upstream call, stream included
    pub request_timeout: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Fans canonical requests out to providers and relays their streams
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    http: HttpClient,
    prices: Arc<PriceTable>,
    options: DispatchOptions,
}

impl Dispatcher {
    /// Dispatcher over a registry, with default options and builtin prices
    pub fn new(registry: ProviderRegistry) -> Result<Self, RelayError> {
        Ok(Self {
            registry: Arc::new(registry),
            http: HttpClient::new()?,
            prices: Arc::new(PriceTable::builtin()),
            options: DispatchOptions::default(),
        })
    }

    /// Replace the dispatch options
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the HTTP client
    pub fn with_http(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }

    /// Replace the price table
    pub fn with_prices(mut self, prices: PriceTable) -> Self {
        self.prices = Arc::new(prices);
        self
    }

    /// Dispatch one turn to `provider_ids`, sending frames as they arrive.
    ///
    /// Returns every provider's outcome keyed by provider id. Fragments
    /// from one provider keep their arrival order; no order holds across
    /// providers. Cancelling `cancel` stops every still-active unit.
    pub async fn dispatch(
        &self,
        request: &ChatRequest,
        provider_ids: &[String],
        events: mpsc::Sender<Frame>,
        cancel: CancellationToken,
    ) -> HashMap<String, ProviderOutcome> {
        let mut tasks = JoinSet::new();
        for provider_id in provider_ids {
            let dispatcher = self.clone();
            let request = request.clone();
            let events = events.clone();
            let cancel = cancel.clone();
            let provider_id = provider_id.clone();
            tasks.spawn(async move {
                dispatcher
                    .run_provider(provider_id, request, events, cancel)
                    .await
            });
        }

        let mut outcomes = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    outcomes.insert(outcome.handle.provider_id.clone(), outcome);
                }
                Err(err) => warn!("provider task failed to join: {err}"),
            }
        }
        outcomes
    }

    async fn run_provider(
        &self,
        provider_id: String,
        mut request: ChatRequest,
        events: mpsc::Sender<Frame>,
        cancel: CancellationToken,
    ) -> ProviderOutcome {
        let handle = StreamHandle::new(&provider_id);
        let request_id = Uuid::new_v4();

        let descriptor = match self.registry.get(&provider_id) {
            Some(d) if d.enabled => d.clone(),
            Some(_) => {
                let error =
                    RelayError::ProviderUnavailable(format!("provider {provider_id} is disabled"));
                return self.fail(handle, error, &events).await;
            }
            None => {
                let error =
                    RelayError::ProviderUnavailable(format!("unknown provider {provider_id}"));
                return self.fail(handle, error, &events).await;
            }
        };

        let api_key = match std::env::var(&descriptor.credential_env) {
            Ok(key) if !key.is_empty() => SecretString::new(key),
            _ => {
                let error = RelayError::ProviderUnavailable(format!(
                    "no credential configured for {provider_id}"
                ));
                return self.fail(handle, error, &events).await;
            }
        };

        // The estimator proposes a cap; the adapter still clamps whatever
        // comes out of here to the descriptor ceiling.
        let family = TokenizerFamily::from(descriptor.family);
        let input_tokens = estimate_request_tokens(&request, family);
        let cap = compute_output_cap(&descriptor, input_tokens, descriptor.output_cap_override);
        request.max_output_tokens = Some(match request.max_output_tokens {
            Some(requested) => requested.min(cap),
            None => cap,
        });

        let adapter = descriptor.family.adapter();
        let model = resolve_model(&request, &descriptor);

        info!(provider = %provider_id, %request_id, model = %model, "dispatching provider call");

        self.attempt_loop(
            handle,
            adapter,
            &descriptor,
            &request,
            api_key,
            family,
            input_tokens,
            model,
            request_id,
            events,
            cancel,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn attempt_loop(
        &self,
        mut handle: StreamHandle,
        adapter: &dyn WireAdapter,
        descriptor: &ProviderDescriptor,
        request: &ChatRequest,
        api_key: SecretString,
        family: TokenizerFamily,
        input_tokens: u32,
        model: String,
        request_id: Uuid,
        events: mpsc::Sender<Frame>,
        cancel: CancellationToken,
    ) -> ProviderOutcome {
        loop {
            handle.attempts += 1;
            let result = self
                .execute_once(
                    adapter,
                    descriptor,
                    request,
                    api_key.expose_secret(),
                    request_id,
                    &mut handle,
                    &events,
                    &cancel,
                )
                .await;

            match result {
                Ok(()) => {
                    let blocks = decompose(&handle.accumulated);
                    let output_tokens = estimate_tokens(&handle.accumulated, family);
                    handle.mark_complete();
                    let meta = DoneMeta {
                        model: model.clone(),
                        attempts: handle.attempts,
                        input_tokens,
                        output_tokens,
                        cost_estimate: self.prices.cost(
                            &handle.provider_id,
                            &model,
                            input_tokens,
                            output_tokens,
                        ),
                        first_byte_ms: handle.first_byte_ms(),
                        total_ms: handle.total_ms(),
                    };
                    let _ = events.send(Frame::done(&handle.provider_id, meta)).await;
                    info!(provider = %handle.provider_id, %request_id, "provider stream complete");
                    return ProviderOutcome { handle, blocks };
                }
                Err(RelayError::Cancelled) => {
                    handle.mark_cancelled();
                    debug!(provider = %handle.provider_id, %request_id, "provider stream cancelled");
                    return ProviderOutcome {
                        handle,
                        blocks: Vec::new(),
                    };
                }
                Err(error) => {
                    // Never retry once fragments have reached the client:
                    // a replayed stream would duplicate deltas.
                    let may_retry = handle.accumulated.is_empty()
                        && self.options.retry.should_retry(&error, handle.attempts);
                    if !may_retry {
                        warn!(
                            provider = %handle.provider_id, %request_id, %error,
                            attempts = handle.attempts, "provider call failed terminally"
                        );
                        return self.fail(handle, error, &events).await;
                    }

                    let delay = self
                        .options
                        .retry
                        .calculate_delay(handle.attempts - 1, &error);
                    warn!(
                        provider = %handle.provider_id, %request_id, %error,
                        delay_ms = delay.as_millis() as u64, "retrying provider call"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            handle.mark_cancelled();
                            return ProviderOutcome { handle, blocks: Vec::new() };
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_once(
        &self,
        adapter: &dyn WireAdapter,
        descriptor: &ProviderDescriptor,
        request: &ChatRequest,
        api_key: &str,
        request_id: Uuid,
        handle: &mut StreamHandle,
        events: &mpsc::Sender<Frame>,
        cancel: &CancellationToken,
    ) -> Result<(), RelayError> {
        let wire = adapter.to_wire_request(request, descriptor, api_key)?;

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(RelayError::Cancelled),
            sent = self.http.post(
                &descriptor.base_url,
                &wire,
                self.options.request_timeout,
                request_id,
            ) => sent?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(adapter.from_wire_error(status.as_u16(), &body));
        }

        if request.stream {
            self.relay_stream(adapter, response, handle, events, cancel)
                .await
        } else {
            let body = tokio::select! {
                _ = cancel.cancelled() => return Err(RelayError::Cancelled),
                body = response.text() => body.map_err(RelayError::from)?,
            };
            let text = adapter.from_wire_response(&body)?;
            handle.append_fragment(&text);
            let _ = events
                .send(Frame::fragment(&handle.provider_id, &text))
                .await;
            Ok(())
        }
    }

    async fn relay_stream(
        &self,
        adapter: &dyn WireAdapter,
        response: reqwest::Response,
        handle: &mut StreamHandle,
        events: &mpsc::Sender<Frame>,
        cancel: &CancellationToken,
    ) -> Result<(), RelayError> {
        let mut decomposer = IncrementalDecomposer::new();
        let mut stream = response.bytes_stream().eventsource();

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => return Err(RelayError::Cancelled),
                event = stream.next() => event,
            };
            let Some(event) = event else { break };

            match event {
                Ok(event) => {
                    for fragment in adapter.from_wire_chunk(&event.data) {
                        handle.append_fragment(&fragment);
                        if events
                            .send(Frame::fragment(&handle.provider_id, &fragment))
                            .await
                            .is_err()
                        {
                            // Client connection gone; stop like a cancel.
                            return Err(RelayError::Cancelled);
                        }
                    }
                    // Growth-gated provisional view; indices stay
                    // unassigned until the stream terminates.
                    if decomposer.update(&handle.accumulated) {
                        debug!(
                            provider = %handle.provider_id,
                            provisional = decomposer.blocks().len(),
                            tail_len = decomposer.pending_tail().len(),
                            "provisional decomposition refreshed"
                        );
                    }
                }
                Err(err) => return Err(RelayError::DecodeError(err.to_string())),
            }
        }
        Ok(())
    }

    async fn fail(
        &self,
        mut handle: StreamHandle,
        error: RelayError,
        events: &mpsc::Sender<Frame>,
    ) -> ProviderOutcome {
        let _ = events.send(Frame::error(&handle.provider_id, &error)).await;
        handle.mark_failed(error);
        ProviderOutcome {
            handle,
            blocks: Vec::new(),
        }
    }
}
