use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::event::{Event, GenericEvent};

/// Per-request (or per-delivery) state shared by every hook invoked while
/// handling that unit of work. Replaces process-wide "already called" flags.
#[derive(Debug, Default)]
pub struct HookScope {
    fired: Mutex<HashSet<String>>,
}

impl HookScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time `key` is seen in this scope, `false` afterwards.
    pub fn first_call(&self, key: &str) -> bool {
        let mut fired = self.fired.lock().unwrap_or_else(|e| e.into_inner());
        fired.insert(key.to_string())
    }
}

/// Typed hook, used for specific event type
#[async_trait]
pub trait Hook<E: Event>: Send + Sync {
    /// Hook identifier
    fn id(&self) -> &str;
    /// Get the topics this hook is interested in
    fn topics(&self) -> &[&str];

    async fn on_register(&self) -> Result<()> {
        Ok(())
    }
    async fn on_event(&self, scope: &HookScope, e: &E) -> Result<HookAction<E>>;
}

/// What a hook wants to happen with the event it received.
#[derive(Debug)]
pub enum HookAction<E: Event> {
    /// Continue with the next hook, event unchanged.
    Pass,
    /// Stop calling later hooks; the caller should skip the guarded action.
    Stop,
    /// Replace the event seen by later hooks (filter semantics).
    Modified(E),
    /// Abort with an error.
    Reject(String),
    /// Stop and hand follow-up events back to the caller.
    Chain(Vec<E>),
}

pub type GenericHookAction = HookAction<GenericEvent>;

/// Generic hook trait object for dynamic dispatch
#[async_trait]
pub trait GenericHook: Send + Sync {
    fn id(&self) -> &str;
    fn topics(&self) -> &[&str];

    async fn on_register(&self) -> Result<()> {
        Ok(())
    }
    async fn on_event(&self, scope: &HookScope, e: &GenericEvent) -> Result<GenericHookAction>;
}

/// Adapter to convert typed Hook<E> into GenericHook
struct HookAdapter<E: Event, H: Hook<E>> {
    hook: Arc<H>,
    _phantom: std::marker::PhantomData<fn() -> E>,
}

#[async_trait]
impl<E: Event + 'static, H: Hook<E> + 'static> GenericHook for HookAdapter<E, H> {
    fn id(&self) -> &str {
        self.hook.id()
    }
    fn topics(&self) -> &[&str] {
        self.hook.topics()
    }
    async fn on_event(
        &self,
        scope: &HookScope,
        generic_event: &GenericEvent,
    ) -> Result<GenericHookAction> {
        let typed_event: E = E::from_generic_event(generic_event)?;
        let action = self.hook.on_event(scope, &typed_event).await?;
        Ok(match action {
            HookAction::Pass => GenericHookAction::Pass,
            HookAction::Stop => GenericHookAction::Stop,
            HookAction::Modified(e) => GenericHookAction::Modified(e.to_generic_event()),
            HookAction::Reject(reason) => GenericHookAction::Reject(reason),
            HookAction::Chain(events) => GenericHookAction::Chain(
                events.into_iter().map(|e| e.to_generic_event()).collect(),
            ),
        })
    }

    async fn on_register(&self) -> Result<()> {
        self.hook.on_register().await
    }
}

/// Hook backed by a plain closure, for handlers that need no lifecycle.
struct FnHook<F> {
    id: String,
    topics: Vec<&'static str>,
    f: F,
}

#[async_trait]
impl<F> GenericHook for FnHook<F>
where
    F: Fn(&HookScope, &GenericEvent) -> Result<GenericHookAction> + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }
    fn topics(&self) -> &[&str] {
        &self.topics
    }
    async fn on_event(&self, scope: &HookScope, e: &GenericEvent) -> Result<GenericHookAction> {
        (self.f)(scope, e)
    }
}

/// Registration options. Lower priorities run first; equal priorities run in
/// registration order.
#[derive(Debug, Clone, Copy)]
pub struct HookOptions {
    pub priority: i32,
    /// Run at most once per [`HookScope`].
    pub once_per_scope: bool,
}

impl Default for HookOptions {
    fn default() -> Self {
        Self {
            priority: 10,
            once_per_scope: false,
        }
    }
}

impl HookOptions {
    pub fn priority(priority: i32) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }
}

#[derive(Clone)]
struct Registered {
    hook: Arc<dyn GenericHook>,
    options: HookOptions,
    seq: u64,
}

/// Registry mapping event topics to ordered hook lists.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<String, Vec<Registered>>,
    next_seq: u64,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a typed hook to the registry
    pub async fn add_hook<E: Event + 'static, H: Hook<E> + 'static>(
        &mut self,
        hook: H,
        options: HookOptions,
    ) -> Result<()> {
        let adapter = Arc::new(HookAdapter::<E, H> {
            hook: Arc::new(hook),
            _phantom: std::marker::PhantomData,
        });
        self.add_generic_hook(adapter, options).await
    }

    /// Add a generic hook to the registry
    pub async fn add_generic_hook(
        &mut self,
        hook: Arc<dyn GenericHook>,
        options: HookOptions,
    ) -> Result<()> {
        hook.on_register().await?;
        let seq = self.next_seq;
        self.next_seq += 1;
        for &topic in hook.topics() {
            let list = self.hooks.entry(topic.to_string()).or_default();
            list.push(Registered {
                hook: hook.clone(),
                options,
                seq,
            });
            list.sort_by_key(|r| (r.options.priority, r.seq));
        }
        Ok(())
    }

    /// Add a closure hook for a single topic.
    pub fn add_fn<F>(&mut self, id: &str, topic: &'static str, options: HookOptions, f: F)
    where
        F: Fn(&HookScope, &GenericEvent) -> Result<GenericHookAction> + Send + Sync + 'static,
    {
        let seq = self.next_seq;
        self.next_seq += 1;
        let hook: Arc<dyn GenericHook> = Arc::new(FnHook {
            id: id.to_string(),
            topics: vec![topic],
            f,
        });
        let list = self.hooks.entry(topic.to_string()).or_default();
        list.push(Registered { hook, options, seq });
        list.sort_by_key(|r| (r.options.priority, r.seq));
    }

    /// Run every hook registered for the event topic, in priority order.
    ///
    /// Returns `Pass` when no hook changed the event, `Modified` with the
    /// final event when at least one did, `Stop`/`Chain` when a hook short
    /// circuited, and an error when a hook rejected the event.
    pub async fn trigger<E: Event>(&self, scope: &HookScope, event: &E) -> Result<HookAction<E>> {
        let hooks = match self.hooks.get(event.topic()) {
            Some(h) if !h.is_empty() => h,
            _ => return Ok(HookAction::Pass),
        };

        let mut generic_event = event.to_generic_event();
        let mut modified = false;
        for registered in hooks {
            if registered.options.once_per_scope {
                let key = format!("hook:{}:{}", registered.hook.id(), generic_event.topic);
                if !scope.first_call(&key) {
                    continue;
                }
            }

            match registered.hook.on_event(scope, &generic_event).await? {
                HookAction::Pass => {}
                HookAction::Modified(new_event) => {
                    generic_event = new_event;
                    modified = true;
                }
                HookAction::Stop => return Ok(HookAction::Stop),
                HookAction::Reject(reason) => {
                    return Err(anyhow::anyhow!(
                        "Event rejected by hook {}: {}",
                        registered.hook.id(),
                        reason
                    ));
                }
                HookAction::Chain(events) => {
                    return Ok(HookAction::Chain(
                        events
                            .iter()
                            .map(E::from_generic_event)
                            .collect::<Result<Vec<E>>>()?,
                    ));
                }
            }
        }

        if modified {
            Ok(HookAction::Modified(E::from_generic_event(&generic_event)?))
        } else {
            Ok(HookAction::Pass)
        }
    }
}
