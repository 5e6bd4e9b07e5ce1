//! Resource-bounded JavaScript modules on QuickJS.
//!
//! A runner holds one `setup` module plus named modules. Every execution builds a fresh runtime
//! with the configured memory, stack and wall-clock limits, links the modules through a built-in
//! loader and calls `main(args)` of a synthesized entry module that forwards to setup's default
//! export.

mod host;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rquickjs::loader::{BuiltinLoader, BuiltinResolver};
use rquickjs::{CatchResultExt, Context, Ctx, Function, Module, Runtime};

use crate::config::ScriptLimits;
use crate::error::{RenderError, RenderResult};
use crate::value::{Value, Variables};

pub use host::HostEnv;

pub(crate) const SETUP_MODULE: &str = "setup";
pub(crate) const SYSTEM_MODULE: &str = "system";
const ENTRY_MODULE: &str = "framewright:main";

const ENTRY_SOURCE: &str = r#"
import setup from 'setup';
export function main(args) {
  return setup(args);
}
"#;

/// Approximate native stack consumed per nested script call.
const STACK_BYTES_PER_CALL: usize = 1024;

/// Named module source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptModule {
    pub name: String,
    pub source: String,
}

impl ScriptModule {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScriptRunner {
    setup: String,
    modules: Vec<ScriptModule>,
    limits: ScriptLimits,
}

impl ScriptRunner {
    /// Build a runner and compile every module once so syntax errors surface early.
    pub fn new(
        setup: impl Into<String>,
        modules: Vec<ScriptModule>,
        limits: ScriptLimits,
    ) -> RenderResult<Self> {
        let mut seen = std::collections::HashSet::new();
        for m in &modules {
            if m.name == SETUP_MODULE || m.name == SYSTEM_MODULE || m.name == ENTRY_MODULE {
                return Err(RenderError::script(format!(
                    "module name '{}' is reserved",
                    m.name
                )));
            }
            if !seen.insert(m.name.as_str()) {
                return Err(RenderError::script(format!(
                    "module '{}' is declared more than once",
                    m.name
                )));
            }
        }
        let runner = Self {
            setup: setup.into(),
            modules,
            limits,
        };
        runner.validate()?;
        Ok(runner)
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name.as_str())
    }

    pub fn limits(&self) -> &ScriptLimits {
        &self.limits
    }

    fn sources(&self) -> impl Iterator<Item = (&str, &str)> {
        std::iter::once((SETUP_MODULE, self.setup.as_str()))
            .chain(std::iter::once((SYSTEM_MODULE, host::SYSTEM_MODULE)))
            .chain(self.modules.iter().map(|m| (m.name.as_str(), m.source.as_str())))
    }

    fn runtime(&self) -> RenderResult<(Runtime, Arc<AtomicBool>)> {
        let rt = Runtime::new()
            .map_err(|e| RenderError::script(format!("cannot create script runtime: {e}")))?;
        let memory = (self.limits.memory_limit_mb * 1024.0 * 1024.0).max(0.0) as usize;
        if memory > 0 {
            rt.set_memory_limit(memory);
        }
        rt.set_max_stack_size(self.limits.recursion_limit as usize * STACK_BYTES_PER_CALL);

        let timed_out = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&timed_out);
        let deadline = Instant::now() + Duration::from_millis(self.limits.timeout_ms);
        rt.set_interrupt_handler(Some(Box::new(move || {
            if Instant::now() >= deadline {
                flag.store(true, Ordering::Relaxed);
                true
            } else {
                false
            }
        })));
        Ok((rt, timed_out))
    }

    /// Compile every module without running anything.
    pub fn validate(&self) -> RenderResult<()> {
        let (rt, timed_out) = self.runtime()?;
        let ctx = Context::full(&rt)
            .map_err(|e| RenderError::script(format!("cannot create script context: {e}")))?;
        ctx.with(|ctx| {
            for (name, source) in self.sources() {
                Module::declare(ctx.clone(), name, source)
                    .catch(&ctx)
                    .map_err(|e| {
                        classify(&timed_out, &self.limits, format!("module '{name}' failed to compile: {e}"))
                    })?;
            }
            Module::declare(ctx.clone(), ENTRY_MODULE, ENTRY_SOURCE)
                .catch(&ctx)
                .map_err(|e| RenderError::script(format!("entry module failed to compile: {e}")))?;
            Ok(())
        })
    }

    /// Run setup's default export with `args` and return the plain object it produced.
    #[tracing::instrument(skip_all, fields(modules = self.modules.len()))]
    pub fn execute(&self, args: &Variables, env: &HostEnv) -> RenderResult<Variables> {
        let started = Instant::now();
        let (rt, timed_out) = self.runtime()?;

        let mut resolver = BuiltinResolver::default();
        let mut loader = BuiltinLoader::default();
        for (name, source) in self.sources() {
            resolver = resolver.with_module(name);
            loader = loader.with_module(name, source);
        }
        rt.set_loader(resolver, loader);

        let ctx = Context::full(&rt)
            .map_err(|e| RenderError::script(format!("cannot create script context: {e}")))?;
        let args_json = serde_json::to_string(&Value::Object(args.clone()).to_json())?;

        let result_json = ctx.with(|ctx| -> RenderResult<Option<String>> {
            let fail = |stage: &str, e: rquickjs::CaughtError<'_>| {
                classify(&timed_out, &self.limits, format!("{stage}: {e}"))
            };

            host::install(&ctx, env)
                .catch(&ctx)
                .map_err(|e| fail("installing host objects failed", e))?;
            let (module, promise) = Module::declare(ctx.clone(), ENTRY_MODULE, ENTRY_SOURCE)
                .and_then(|m| m.eval())
                .catch(&ctx)
                .map_err(|e| fail("loading modules failed", e))?;
            promise
                .finish::<()>()
                .catch(&ctx)
                .map_err(|e| fail("evaluating modules failed", e))?;

            let main: Function = module
                .get("main")
                .catch(&ctx)
                .map_err(|e| fail("entry has no main", e))?;
            let js_args = ctx
                .json_parse(args_json.as_str())
                .catch(&ctx)
                .map_err(|e| fail("passing arguments failed", e))?;
            let mut out: rquickjs::Value = main
                .call((js_args,))
                .catch(&ctx)
                .map_err(|e| fail("setup threw", e))?;
            if let Some(p) = out.as_promise().cloned() {
                out = p
                    .finish::<rquickjs::Value>()
                    .catch(&ctx)
                    .map_err(|e| fail("setup rejected", e))?;
            }
            stringify(&ctx, out)
                .catch(&ctx)
                .map_err(|e| fail("setup result is not serializable", e))
        })?;

        let vars = match result_json {
            None => Variables::new(),
            Some(json) => match Value::from_json(serde_json::from_str(&json)?) {
                Value::Object(map) => map,
                Value::Null | Value::Undefined => Variables::new(),
                other => {
                    return Err(RenderError::script(format!(
                        "setup must return an object, got {}",
                        other.type_name()
                    )));
                }
            },
        };
        tracing::debug!(
            keys = vars.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "setup script finished"
        );
        Ok(vars)
    }
}

fn stringify<'js>(ctx: &Ctx<'js>, v: rquickjs::Value<'js>) -> rquickjs::Result<Option<String>> {
    if v.is_undefined() || v.is_null() {
        return Ok(None);
    }
    match ctx.json_stringify(v)? {
        Some(s) => Ok(Some(s.to_string()?)),
        None => Ok(None),
    }
}

/// Name the limit a failure hit, when it hit one.
fn classify(timed_out: &AtomicBool, limits: &ScriptLimits, message: String) -> RenderError {
    if timed_out.load(Ordering::Relaxed) {
        return RenderError::script(format!(
            "script exceeded the {} ms timeout ({message})",
            limits.timeout_ms
        ));
    }
    let lower = message.to_ascii_lowercase();
    if lower.contains("stack overflow") {
        return RenderError::script(format!(
            "script exceeded the recursion limit of {} ({message})",
            limits.recursion_limit
        ));
    }
    if lower.contains("out of memory") || lower.contains("allocation") {
        return RenderError::script(format!(
            "script exceeded the {} MB memory limit ({message})",
            limits.memory_limit_mb
        ));
    }
    RenderError::script(message)
}

#[cfg(test)]
#[path = "../../tests/unit/script/runner.rs"]
mod tests;
