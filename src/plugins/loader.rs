//! Route registry.
//!
//! Registers every module of the manifest exactly once, at startup. A module
//! is registered atomically: its registrar runs against an empty
//! [`RouteScope`], the collected paths are validated, and only then are the
//! routes merged into the router. Any failure (an error, a panic, an invalid
//! or already claimed path) skips that module, is logged with its identity
//! and never stops the remaining modules from loading.

use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};

use axum::Router;
use tracing::{error, info};

use super::{PluginContext, RouteModule, RouteScope};
use crate::error::PluginError;
use crate::server::pages::panic_message;

/// Owner recorded for paths reserved by the gateway itself.
const BUILTIN_OWNER: &str = "the gateway";

/// One route attached by a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredRoute {
    /// Route path
    pub path: String,

    /// Identity of the owning module
    pub module: String,
}

/// A module that could not be registered.
#[derive(Debug, Clone)]
pub struct LoadFailure {
    /// Identity of the failed module
    pub module: String,

    /// Why it failed
    pub error: PluginError,
}

/// Outcome of a full registration pass.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Number of modules registered successfully
    pub loaded: usize,

    /// Routes attached by the successful modules
    pub routes: Vec<RegisteredRoute>,

    /// Modules that were skipped
    pub failures: Vec<LoadFailure>,
}

/// Router with every plugin route merged in, plus the report.
#[derive(Debug)]
pub struct LoadedRoutes {
    /// Router containing the base routes and every registered plugin route
    pub router: Router,

    /// What happened during registration
    pub report: LoadReport,
}

/// Registers route modules onto a base router.
#[derive(Debug)]
pub struct RouteRegistry {
    router: Router,
    context: PluginContext,
    claimed: HashMap<String, String>,
}

impl RouteRegistry {
    /// Create a registry merging plugin routes into `base`.
    pub fn new(base: Router, context: PluginContext) -> Self {
        Self {
            router: base,
            context,
            claimed: HashMap::new(),
        }
    }

    /// Mark paths already served by the base router as unavailable to plugins.
    pub fn reserve<'p>(mut self, paths: impl IntoIterator<Item = &'p str>) -> Self {
        for path in paths {
            self.claimed
                .insert(path.to_string(), BUILTIN_OWNER.to_string());
        }
        self
    }

    /// Register every module and report the tally once the scan completes.
    ///
    /// Modules are consumed, so a registrar can never run twice.
    pub fn load_all<I>(mut self, modules: I) -> LoadedRoutes
    where
        I: IntoIterator<Item = Box<dyn RouteModule>>,
    {
        let mut report = LoadReport::default();

        for module in modules {
            let identity = module.identity().to_string();
            match self.load_one(module.as_ref()) {
                Ok(paths) => {
                    info!(module = %identity, routes = paths.len(), "Loaded route module");
                    report.loaded += 1;
                    report
                        .routes
                        .extend(paths.into_iter().map(|path| RegisteredRoute {
                            path,
                            module: identity.clone(),
                        }));
                }
                Err(error) => {
                    error!(module = %identity, "Error loading route module: {}", error);
                    report.failures.push(LoadFailure {
                        module: identity,
                        error,
                    });
                }
            }
        }

        info!(
            loaded = report.loaded,
            failed = report.failures.len(),
            "Load complete. Total routes loaded: {}",
            report.loaded
        );

        LoadedRoutes {
            router: self.router,
            report,
        }
    }

    fn load_one(&mut self, module: &dyn RouteModule) -> Result<Vec<String>, PluginError> {
        let mut scope = RouteScope::new(module.identity(), &self.context);

        match panic::catch_unwind(AssertUnwindSafe(|| module.register(&mut scope))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(payload) => return Err(PluginError::Panicked(panic_message(&*payload))),
        }

        let routes = scope.into_routes();
        self.validate(module.identity(), routes.iter().map(|(path, _)| path.as_str()))?;

        let mut router = self.router.clone();
        let mut paths = Vec::with_capacity(routes.len());
        for (path, method_router) in routes {
            let candidate = router;
            let route_path = path.clone();
            router = panic::catch_unwind(AssertUnwindSafe(move || {
                candidate.route(&route_path, method_router)
            }))
            .map_err(|payload| {
                PluginError::Registration(format!(
                    "router rejected '{}': {}",
                    path,
                    panic_message(&*payload)
                ))
            })?;
            paths.push(path);
        }

        self.router = router;
        for path in &paths {
            self.claimed
                .insert(path.clone(), module.identity().to_string());
        }

        Ok(paths)
    }

    fn validate<'p>(
        &self,
        identity: &str,
        paths: impl Iterator<Item = &'p str>,
    ) -> Result<(), PluginError> {
        let mut seen = HashSet::new();

        for path in paths {
            if !path.starts_with('/') {
                return Err(PluginError::InvalidPath {
                    path: path.to_string(),
                });
            }
            if let Some(owner) = self.claimed.get(path) {
                return Err(PluginError::DuplicateRoute {
                    path: path.to_string(),
                    owner: owner.clone(),
                });
            }
            if !seen.insert(path) {
                return Err(PluginError::DuplicateRoute {
                    path: path.to_string(),
                    owner: identity.to_string(),
                });
            }
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
