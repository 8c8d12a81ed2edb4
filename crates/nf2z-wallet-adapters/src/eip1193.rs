use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use alloy::primitives::{address, Address};
use futures::channel::oneshot;
use serde_json::Value;

use nf2z_wallet_core::ports::{CODE_INTERNAL, METHOD_CHAIN_ID, METHOD_REQUEST_ACCOUNTS};
use nf2z_wallet_core::{
    ChainId, EventHandler, ProviderError, ProviderEvent, ProviderEventKind, ProviderPort,
    Subscription,
};

use crate::WalletAdapterConfig;

/// EIP-1193 `4200 Unsupported Method`.
const CODE_UNSUPPORTED_METHOD: i64 = 4200;

const DETERMINISTIC_ACCOUNT: Address = address!("1000000000000000000000000000000000000001");

/// Wallet provider adapter.
///
/// Runs against `window.ethereum` in the browser, a JSON-RPC proxy on native
/// targets, or an in-memory deterministic wallet for development and tests.
#[derive(Clone)]
pub struct Eip1193Adapter {
    mode: ProviderMode,
    state: Rc<RefCell<ProviderState>>,
}

#[derive(Debug, Clone)]
enum ProviderMode {
    Disabled(String),
    Deterministic,
    #[cfg(not(target_arch = "wasm32"))]
    Proxy(ProxyRuntime),
    #[cfg(target_arch = "wasm32")]
    Browser,
}

#[derive(Debug, Clone)]
#[cfg(not(target_arch = "wasm32"))]
struct ProxyRuntime {
    base_url: String,
    client: reqwest::Client,
}

struct ProviderState {
    accounts: Vec<Address>,
    chain_id: ChainId,
    failures: Vec<(Option<String>, ProviderError)>,
    hold_requests: bool,
    held: Vec<oneshot::Sender<()>>,
    requests: Vec<String>,
    rpc_id: u64,
    next_listener_id: u64,
    listeners: Vec<Listener>,
}

struct Listener {
    subscription: Subscription,
    handler: EventHandler,
    #[cfg(target_arch = "wasm32")]
    js_callback: Option<wasm_bindgen::closure::Closure<dyn FnMut(wasm_bindgen::JsValue)>>,
}

impl Default for ProviderState {
    fn default() -> Self {
        Self {
            accounts: vec![DETERMINISTIC_ACCOUNT],
            chain_id: ChainId(1),
            failures: Vec::new(),
            hold_requests: false,
            held: Vec::new(),
            requests: Vec::new(),
            rpc_id: 0,
            next_listener_id: 0,
            listeners: Vec::new(),
        }
    }
}

impl Default for Eip1193Adapter {
    fn default() -> Self {
        Self::with_config(WalletAdapterConfig::from_env_or_default())
    }
}

impl Eip1193Adapter {
    pub fn with_config(config: WalletAdapterConfig) -> Self {
        #[cfg(target_arch = "wasm32")]
        let mode = if browser::provider().is_ok() {
            ProviderMode::Browser
        } else {
            Self::fallback_mode(&config, "no EIP-1193 browser provider injected")
        };

        #[cfg(not(target_arch = "wasm32"))]
        let mode = if let Some(ref base_url) = config.eip1193_proxy_url {
            let timeout = std::time::Duration::from_millis(config.provider_timeout_ms);
            match reqwest::Client::builder().timeout(timeout).build() {
                Ok(client) => ProviderMode::Proxy(ProxyRuntime {
                    base_url: base_url.clone(),
                    client,
                }),
                Err(e) => Self::fallback_mode(
                    &config,
                    &format!("failed to initialize EIP-1193 proxy client: {e}"),
                ),
            }
        } else {
            Self::fallback_mode(&config, "EIP-1193 proxy URL not configured")
        };

        let state = ProviderState {
            chain_id: ChainId(config.deterministic_chain_id),
            ..ProviderState::default()
        };
        tracing::debug!(mode = mode.name(), "wallet provider adapter initialized");
        Self {
            mode,
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Mode used when no real provider is reachable.
    fn fallback_mode(config: &WalletAdapterConfig, reason: &str) -> ProviderMode {
        if config.deterministic_wallet_enabled() {
            tracing::warn!(reason, "using deterministic wallet");
            return ProviderMode::Deterministic;
        }
        if config.deterministic_wallet && config.strict_runtime_required() {
            tracing::warn!("deterministic wallet refused in production runtime profile");
        }
        ProviderMode::Disabled(reason.to_owned())
    }

    pub fn deterministic() -> Self {
        Self::with_mode(ProviderMode::Deterministic)
    }

    /// Adapter for a runtime with no injected wallet.
    pub fn disabled(reason: impl Into<String>) -> Self {
        Self::with_mode(ProviderMode::Disabled(reason.into()))
    }

    fn with_mode(mode: ProviderMode) -> Self {
        Self {
            mode,
            state: Rc::new(RefCell::new(ProviderState::default())),
        }
    }

    pub fn mode_name(&self) -> &'static str {
        self.mode.name()
    }

    fn check_mode(&self) -> Result<(), ProviderError> {
        if let ProviderMode::Disabled(reason) = &self.mode {
            tracing::debug!(reason = reason.as_str(), "wallet provider disabled");
            return Err(ProviderError::NotInstalled);
        }
        Ok(())
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.state.borrow_mut().accounts = accounts;
    }

    pub fn set_chain_id(&self, chain_id: ChainId) {
        self.state.borrow_mut().chain_id = chain_id;
    }

    /// The next deterministic request fails with `error` instead of answering.
    pub fn fail_next_request(&self, error: ProviderError) {
        self.state.borrow_mut().failures.push((None, error));
    }

    /// The next deterministic request for `method` fails with `error`.
    pub fn fail_method(&self, method: &str, error: ProviderError) {
        self.state
            .borrow_mut()
            .failures
            .push((Some(method.to_owned()), error));
    }

    /// While held, deterministic requests stay pending until [`Self::release_held`].
    pub fn hold_requests(&self, hold: bool) {
        self.state.borrow_mut().hold_requests = hold;
    }

    pub fn release_held(&self) -> usize {
        let held = std::mem::take(&mut self.state.borrow_mut().held);
        let count = held.len();
        for gate in held {
            let _ = gate.send(());
        }
        count
    }

    pub fn request_count(&self, method: &str) -> usize {
        self.state
            .borrow()
            .requests
            .iter()
            .filter(|m| m.as_str() == method)
            .count()
    }

    pub fn total_requests(&self) -> usize {
        self.state.borrow().requests.len()
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    pub fn debug_inject_accounts_changed(&self, accounts: Vec<Address>) -> usize {
        self.state.borrow_mut().accounts = accounts.clone();
        self.dispatch(ProviderEvent::AccountsChanged(accounts))
    }

    pub fn debug_inject_chain_changed(&self, chain_id: ChainId) -> usize {
        self.state.borrow_mut().chain_id = chain_id;
        self.dispatch(ProviderEvent::ChainChanged(chain_id))
    }

    pub fn debug_inject_disconnect(&self, code: i64, message: impl Into<String>) -> usize {
        self.dispatch(ProviderEvent::Disconnect {
            code,
            message: message.into(),
        })
    }

    /// Delivers `event` to every listener of its kind. The handler list is
    /// copied first so handlers may unsubscribe while it runs.
    fn dispatch(&self, event: ProviderEvent) -> usize {
        let kind = event.kind();
        let handlers: Vec<EventHandler> = self
            .state
            .borrow()
            .listeners
            .iter()
            .filter(|l| l.subscription.kind == kind)
            .map(|l| Rc::clone(&l.handler))
            .collect();
        tracing::debug!(event = kind.as_str(), listeners = handlers.len(), "dispatching provider event");
        for handler in &handlers {
            handler(&event);
        }
        handlers.len()
    }

    async fn deterministic_request(&self, method: &str) -> Result<Value, ProviderError> {
        let gate = {
            let mut g = self.state.borrow_mut();
            if g.hold_requests {
                let (tx, rx) = oneshot::channel();
                g.held.push(tx);
                Some(rx)
            } else {
                None
            }
        };
        if let Some(gate) = gate {
            // A dropped sender releases the request as well.
            let _ = gate.await;
        }

        let mut g = self.state.borrow_mut();
        let scripted = g
            .failures
            .iter()
            .position(|(m, _)| m.as_deref().map_or(true, |m| m == method));
        if let Some(i) = scripted {
            return Err(g.failures.remove(i).1);
        }
        match method {
            METHOD_REQUEST_ACCOUNTS => Ok(serde_json::json!(g
                .accounts
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>())),
            METHOD_CHAIN_ID => Ok(Value::String(g.chain_id.to_hex())),
            other => Err(ProviderError::Unknown {
                code: CODE_UNSUPPORTED_METHOD,
                message: format!("deterministic wallet does not support {other}"),
            }),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    async fn proxy_call(
        &self,
        proxy: &ProxyRuntime,
        method: &str,
        params: Value,
    ) -> Result<Value, ProviderError> {
        let id = {
            let mut g = self.state.borrow_mut();
            g.rpc_id = g.rpc_id.saturating_add(1);
            g.rpc_id
        };
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response = proxy
            .client
            .post(&proxy.base_url)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let body: Value = response.json().await.map_err(transport_error)?;
        if let Some(err) = body.get("error") {
            return Err(rpc_error(err));
        }
        if !status.is_success() {
            return Err(ProviderError::Unknown {
                code: i64::from(status.as_u16()),
                message: format!("eip1193 proxy status {status}: {body}"),
            });
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| ProviderError::malformed("eip1193 proxy response missing result"))
    }
}

impl ProviderMode {
    fn name(&self) -> &'static str {
        match self {
            Self::Disabled(_) => "disabled",
            Self::Deterministic => "deterministic",
            #[cfg(not(target_arch = "wasm32"))]
            Self::Proxy(_) => "proxy",
            #[cfg(target_arch = "wasm32")]
            Self::Browser => "browser",
        }
    }
}

impl ProviderPort for Eip1193Adapter {
    fn is_available(&self) -> bool {
        match &self.mode {
            ProviderMode::Disabled(_) => false,
            ProviderMode::Deterministic => true,
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(_) => true,
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => browser::provider().is_ok(),
        }
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.check_mode()?;
        self.state.borrow_mut().requests.push(method.to_owned());
        tracing::debug!(method, mode = self.mode.name(), "provider request");

        match &self.mode {
            ProviderMode::Disabled(_) => Err(ProviderError::NotInstalled),
            ProviderMode::Deterministic => self.deterministic_request(method).await,
            #[cfg(not(target_arch = "wasm32"))]
            ProviderMode::Proxy(proxy) => self.proxy_call(proxy, method, params).await,
            #[cfg(target_arch = "wasm32")]
            ProviderMode::Browser => browser::request(method, params).await,
        }
    }

    fn subscribe(
        &self,
        kind: ProviderEventKind,
        handler: EventHandler,
    ) -> Result<Subscription, ProviderError> {
        self.check_mode()?;

        #[cfg(target_arch = "wasm32")]
        let js_callback = if matches!(self.mode, ProviderMode::Browser) {
            Some(browser::listen(kind, Rc::clone(&handler))?)
        } else {
            None
        };

        let mut g = self.state.borrow_mut();
        g.next_listener_id = g.next_listener_id.saturating_add(1);
        let subscription = Subscription {
            kind,
            id: g.next_listener_id,
        };
        g.listeners.push(Listener {
            subscription,
            handler,
            #[cfg(target_arch = "wasm32")]
            js_callback,
        });
        Ok(subscription)
    }

    fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let removed = {
            let mut g = self.state.borrow_mut();
            let position = g
                .listeners
                .iter()
                .position(|l| l.subscription == *subscription);
            position.map(|i| g.listeners.remove(i))
        };
        match removed {
            Some(listener) => {
                release_listener(listener);
                true
            }
            None => false,
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn release_listener(listener: Listener) {
    if let Some(ref callback) = listener.js_callback {
        browser::unlisten(listener.subscription.kind, callback);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn release_listener(_listener: Listener) {}

impl fmt::Debug for Eip1193Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = self.state.borrow();
        f.debug_struct("Eip1193Adapter")
            .field("mode", &self.mode)
            .field("accounts", &g.accounts)
            .field("chain_id", &g.chain_id)
            .field("listeners", &g.listeners.len())
            .field("held", &g.held.len())
            .finish()
    }
}

fn rpc_error(err: &Value) -> ProviderError {
    let code = err
        .get("code")
        .and_then(Value::as_i64)
        .unwrap_or(CODE_INTERNAL);
    let message = err
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    ProviderError::from_rpc(code, message)
}

#[cfg(not(target_arch = "wasm32"))]
fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        return ProviderError::Timeout;
    }
    let code = if e.is_connect() {
        nf2z_wallet_core::ports::CODE_DISCONNECTED
    } else {
        CODE_INTERNAL
    };
    ProviderError::Unknown {
        code,
        message: format!("eip1193 proxy request failed: {e}"),
    }
}

#[cfg(target_arch = "wasm32")]
mod browser {
    use serde_json::Value;
    use wasm_bindgen::{closure::Closure, JsCast, JsValue};

    use nf2z_wallet_core::{EventHandler, ProviderError, ProviderEvent, ProviderEventKind};

    use super::{rpc_error, CODE_INTERNAL, CODE_UNSUPPORTED_METHOD};

    pub(super) fn provider() -> Result<JsValue, ProviderError> {
        let window = web_sys::window().ok_or(ProviderError::NotInstalled)?;
        let provider = get_prop(&JsValue::from(window), "ethereum")?;
        if provider.is_null() || provider.is_undefined() {
            return Err(ProviderError::NotInstalled);
        }
        Ok(provider)
    }

    fn get_prop(target: &JsValue, key: &str) -> Result<JsValue, ProviderError> {
        js_sys::Reflect::get(target, &JsValue::from_str(key)).map_err(|e| {
            ProviderError::malformed(format!("read provider property {key} failed: {e:?}"))
        })
    }

    fn function(target: &JsValue, names: &[&str]) -> Result<js_sys::Function, ProviderError> {
        names
            .iter()
            .find_map(|name| {
                get_prop(target, name)
                    .ok()
                    .and_then(|v| v.dyn_into::<js_sys::Function>().ok())
            })
            .ok_or_else(|| ProviderError::Unknown {
                code: CODE_UNSUPPORTED_METHOD,
                message: format!("window.ethereum does not expose {}", names.join("/")),
            })
    }

    pub(super) async fn request(method: &str, params: Value) -> Result<Value, ProviderError> {
        let provider = provider()?;
        let request_fn = function(&provider, &["request"])?;
        let request = serde_json::json!({
            "method": method,
            "params": params,
        });
        let request_js = serde_wasm_bindgen::to_value(&request)
            .map_err(|e| ProviderError::malformed(format!("failed to encode request: {e}")))?;
        let promise = request_fn
            .call1(&provider, &request_js)
            .map_err(rejection)?
            .dyn_into::<js_sys::Promise>()
            .map_err(|_| ProviderError::malformed("provider request did not return a Promise"))?;
        let result = wasm_bindgen_futures::JsFuture::from(promise)
            .await
            .map_err(rejection)?;
        serde_wasm_bindgen::from_value(result)
            .map_err(|e| ProviderError::malformed(format!("failed to decode response: {e}")))
    }

    pub(super) fn listen(
        kind: ProviderEventKind,
        handler: EventHandler,
    ) -> Result<Closure<dyn FnMut(JsValue)>, ProviderError> {
        let provider = provider()?;
        let on_fn = function(&provider, &["on", "addListener"])?;
        let callback = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            match decode_event(kind, value) {
                Some(event) => handler(&event),
                None => tracing::warn!(event = kind.as_str(), "undecodable provider event dropped"),
            }
        });
        on_fn
            .call2(
                &provider,
                &JsValue::from_str(kind.as_str()),
                callback.as_ref().unchecked_ref(),
            )
            .map_err(|e| {
                ProviderError::malformed(format!("register {} failed: {e:?}", kind.as_str()))
            })?;
        Ok(callback)
    }

    pub(super) fn unlisten(kind: ProviderEventKind, callback: &Closure<dyn FnMut(JsValue)>) {
        let Ok(provider) = provider() else {
            return;
        };
        let Ok(remove_fn) = function(&provider, &["removeListener", "off"]) else {
            tracing::warn!(event = kind.as_str(), "provider cannot remove listeners");
            return;
        };
        if let Err(e) = remove_fn.call2(
            &provider,
            &JsValue::from_str(kind.as_str()),
            callback.as_ref().unchecked_ref(),
        ) {
            tracing::warn!(event = kind.as_str(), error = ?e, "removeListener failed");
        }
    }

    fn decode_event(kind: ProviderEventKind, value: JsValue) -> Option<ProviderEvent> {
        let payload = match kind {
            // Provider errors keep code and message as non-enumerable props.
            ProviderEventKind::Disconnect => serde_json::json!({
                "code": get_prop(&value, "code").ok().and_then(|v| v.as_f64()).map(|c| c as i64),
                "message": get_prop(&value, "message").ok().and_then(|v| v.as_string()),
            }),
            _ => serde_wasm_bindgen::from_value::<Value>(value).ok()?,
        };
        ProviderEvent::decode(kind, &payload)
    }

    fn rejection(err: JsValue) -> ProviderError {
        let code = get_prop(&err, "code").ok().and_then(|v| v.as_f64());
        let message = get_prop(&err, "message").ok().and_then(|v| v.as_string());
        match code {
            Some(code) => rpc_error(&serde_json::json!({
                "code": code as i64,
                "message": message.unwrap_or_default(),
            })),
            None => ProviderError::Unknown {
                code: CODE_INTERNAL,
                message: message.unwrap_or_else(|| format!("provider request rejected: {err:?}")),
            },
        }
    }
}
