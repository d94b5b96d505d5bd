use crate::binder::{Binder, RawRequestPayloads, RequestContext, RequestId};
use crate::config::RuntimeConfig;
use crate::envelope::HandlerResponse;
use crate::error::BindError;
use crate::registry::BindingRegistry;
use crate::signature::HandlerSignature;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn};

/// Route every dispatcher answers with `ok`.
pub const PING_ROUTE: &str = "ping";

/// Registered handler function.
pub type HandlerFn =
    Arc<dyn Fn(&RequestContext) -> anyhow::Result<HandlerResponse> + Send + Sync + 'static>;

struct Route {
    signature: HandlerSignature,
    handler: HandlerFn,
}

/// Handler table plus the binder and descriptor cache it dispatches through.
pub struct Dispatcher {
    routes: HashMap<String, Route>,
    registry: BindingRegistry,
    binder: Binder,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Dispatcher configured from the environment, with the `ping` route registered.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&RuntimeConfig::from_env())
    }

    #[must_use]
    pub fn with_config(config: &RuntimeConfig) -> Self {
        let binder = Binder::with_config(config);
        let registry = BindingRegistry::with_cache(binder.validators().clone());
        let mut dispatcher = Self {
            routes: HashMap::new(),
            registry,
            binder,
        };
        dispatcher.register(HandlerSignature::new(PING_ROUTE), |_ctx: &RequestContext| {
            Ok(HandlerResponse::text(200, "ok"))
        });
        dispatcher
    }

    /// Register a handler under its signature's name.
    ///
    /// The descriptor is resolved on first dispatch. If a handler with the same name
    /// already exists it is replaced together with its cached descriptor.
    pub fn register<F>(&mut self, signature: HandlerSignature, handler: F)
    where
        F: Fn(&RequestContext) -> anyhow::Result<HandlerResponse> + Send + Sync + 'static,
    {
        let route = signature.handler_name().to_string();
        if self.routes.contains_key(&route) {
            self.registry.remove(&route);
            warn!(
                handler_name = %route,
                total_handlers = self.routes.len(),
                "Replaced existing handler"
            );
        }
        self.routes.insert(
            route.clone(),
            Route {
                signature,
                handler: Arc::new(handler),
            },
        );
        info!(
            handler_name = %route,
            total_handlers = self.routes.len(),
            "Handler registered successfully"
        );
    }

    /// Register a handler and resolve its descriptor immediately, compiling its schemas.
    pub fn register_eager<F>(&mut self, signature: HandlerSignature, handler: F) -> Result<(), BindError>
    where
        F: Fn(&RequestContext) -> anyhow::Result<HandlerResponse> + Send + Sync + 'static,
    {
        self.registry.register(&signature)?;
        let route = signature.handler_name().to_string();
        self.routes.insert(
            route.clone(),
            Route {
                signature,
                handler: Arc::new(handler),
            },
        );
        info!(handler_name = %route, "Handler registered with precompiled schemas");
        Ok(())
    }

    /// Resolve every registered route and compile its schemas. Returns the route count.
    pub fn precompile(&self) -> Result<usize, BindError> {
        for route in self.routes.values() {
            self.registry.register(&route.signature)?;
        }
        Ok(self.routes.len())
    }

    #[must_use]
    pub fn has_route(&self, route: &str) -> bool {
        self.routes.contains_key(route)
    }

    /// Registered route ids, sorted.
    #[must_use]
    pub fn routes(&self) -> Vec<&str> {
        let mut routes: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        routes.sort_unstable();
        routes
    }

    #[must_use]
    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    #[must_use]
    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    /// Dispatch a request with a freshly minted request id.
    #[must_use]
    pub fn dispatch(&self, route: &str, raw: RawRequestPayloads) -> HandlerResponse {
        self.dispatch_with_id(route, raw, RequestId::new())
    }

    /// Dispatch a request, correlating logs with `request_id`.
    #[must_use]
    pub fn dispatch_with_id(
        &self,
        route: &str,
        raw: RawRequestPayloads,
        request_id: RequestId,
    ) -> HandlerResponse {
        let span = info_span!("dispatch", request_id = %request_id, route = %route);
        let _guard = span.enter();

        let Some(entry) = self.routes.get(route) else {
            warn!(
                request_id = %request_id,
                route = %route,
                "No handler registered for route"
            );
            return HandlerResponse::error(404, "Handler not found");
        };

        let descriptor = self
            .registry
            .get_or_resolve(route, || entry.signature.clone());

        let bound = match self.binder.bind(&raw, &descriptor) {
            Ok(bound) => bound,
            Err(e) => return e.to_response_for(request_id),
        };

        let mut ctx = RequestContext::new(route, raw).with_request_id(request_id);
        bound.inject_into(&mut ctx);
        invoke(&entry.handler, &ctx)
    }
}

fn invoke(handler: &HandlerFn, ctx: &RequestContext) -> HandlerResponse {
    let request_id = ctx.request_id();
    let handler_name = ctx.handler_name();
    let execution_start = Instant::now();

    match catch_unwind(AssertUnwindSafe(|| handler(ctx))) {
        Ok(Ok(response)) => {
            info!(
                request_id = %request_id,
                handler_name = %handler_name,
                status = response.status,
                execution_time_ms = execution_start.elapsed().as_millis() as u64,
                "Handler execution complete"
            );
            response
        }
        Ok(Err(e)) => {
            error!(
                request_id = %request_id,
                handler_name = %handler_name,
                error = %format!("{e:#}"),
                "Handler returned an error"
            );
            HandlerResponse::error(500, "Internal Server Error")
        }
        Err(panic) => {
            let panic_message = panic_message(panic.as_ref());
            error!(
                request_id = %request_id,
                handler_name = %handler_name,
                panic_message = %panic_message,
                "Handler panicked - CRITICAL"
            );
            HandlerResponse::error(500, &format!("Handler panicked: {panic_message}"))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
