//! Stateful components.
//!
//! A component is a fragment of a page that keeps its data between
//! requests. Its state is restored when the page is rendered again, either
//! from the cache (addressed by an `X-State-<identity>` cookie) or from the
//! query string, depending on `component.state`.
//!
//! Links produced by [`Context::action`] address one of the component's
//! actions. When such a link is followed, [`Context::component`] restores
//! the state, runs the action and persists the result.
//!
//! # Example
//!
//! ```rust
//! use daedalus_component::{fields, Fields};
//! use daedalus_core::{DaedalusResult, Outcome};
//! use daedalus_middleware::BoxFuture;
//! use daedalus_server::{Actions, Component, Context};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct Pager {
//!     page: u32,
//! }
//!
//! fn next<'a>(pager: &'a mut Pager, _ctx: &'a Context) -> BoxFuture<'a, DaedalusResult<()>> {
//!     Box::pin(async move {
//!         pager.page += 1;
//!         Ok(())
//!     })
//! }
//!
//! impl Component for Pager {
//!     const NAME: &'static str = "pager";
//!
//!     fn actions() -> Actions<Self> {
//!         Actions::new().on("next", next)
//!     }
//!
//!     fn fields() -> Fields<Self> {
//!         fields!(Pager { page })
//!     }
//! }
//!
//! async fn list(ctx: Context) -> DaedalusResult<Outcome> {
//!     let pager = ctx.component(Pager::default()).await?;
//!     let more = ctx.action(&*pager, "next");
//!     ctx.render(format!("page {} <a href=\"{more}\">next</a>", pager.page))
//! }
//! ```

use std::ops::{Deref, DerefMut};

use daedalus_component::{ActionCall, ComponentIdentity, Fields, QueryCodec, StateStore};
use daedalus_config::StateMode;
use daedalus_core::names::ACTION_PARAM;
use daedalus_core::DaedalusResult;
use daedalus_middleware::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::context::Context;

/// An action: mutates the component, may fail the request.
pub type Action<C> = for<'a> fn(&'a mut C, &'a Context) -> BoxFuture<'a, DaedalusResult<()>>;

/// The actions a component answers to, by method name.
pub struct Actions<C> {
    entries: Vec<(&'static str, Action<C>)>,
}

impl<C> Actions<C> {
    /// An empty table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Binds `method` to `action`. A later binding of the same method wins.
    #[must_use]
    pub fn on(mut self, method: &'static str, action: Action<C>) -> Self {
        self.entries.retain(|(name, _)| *name != method);
        self.entries.push((method, action));
        self
    }

    /// The action bound to `method`.
    pub fn get(&self, method: &str) -> Option<Action<C>> {
        self.entries
            .iter()
            .find(|(name, _)| *name == method)
            .map(|(_, action)| *action)
    }

    /// Bound method names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }
}

impl<C> Default for Actions<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for Actions<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// A stateful page fragment.
pub trait Component: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name used in the component identity, state cookie and query keys.
    const NAME: &'static str;

    /// Actions reachable through [`Context::action`] links.
    fn actions() -> Actions<Self> {
        Actions::new()
    }

    /// Fields persisted in the query string when `component.state` is
    /// `query`.
    fn fields() -> Fields<Self> {
        Fields::default()
    }

    /// Called after the state was restored and before any action runs.
    fn mount(&mut self, _ctx: &Context) {}
}

/// A component after restore, mount and action.
#[derive(Debug)]
pub struct Mounted<C> {
    component: C,
    identity: ComponentIdentity,
    invoked: Option<String>,
}

impl<C> Mounted<C> {
    /// Identity of the component on the current route.
    pub fn identity(&self) -> &ComponentIdentity {
        &self.identity
    }

    /// The action that ran during this request.
    pub fn invoked(&self) -> Option<&str> {
        self.invoked.as_deref()
    }

    /// Unwraps the component.
    pub fn into_inner(self) -> C {
        self.component
    }
}

impl<C> Deref for Mounted<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.component
    }
}

impl<C> DerefMut for Mounted<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.component
    }
}

impl Context {
    /// Identity of `C` on the current route.
    pub fn component_identity<C: Component>(&self) -> ComponentIdentity {
        let route = self.route();
        ComponentIdentity::for_route(route.module(), route.controller(), route.name(), C::NAME)
    }

    /// Restores `component`, mounts it and runs the action the request
    /// addresses to it, if any.
    ///
    /// `component` holds the initial values used when nothing was stored.
    /// In cache mode the state is written back after an action.
    pub async fn component<C: Component>(&self, mut component: C) -> DaedalusResult<Mounted<C>> {
        let identity = self.component_identity::<C>();

        let mut store = match self.config().component.state {
            StateMode::Cache => {
                let store = StateStore::load(
                    self.cache().clone(),
                    self.cookies(),
                    identity.as_str(),
                    self.client().clone(),
                )
                .await?;
                if let Some(saved) = store.get::<C>()? {
                    component = saved;
                }
                Some(store)
            }
            StateMode::Query => {
                query_codec::<C>().decode_pairs(&mut component, &C::fields(), self.query_pairs());
                None
            }
        };

        component.mount(self);

        let invoked = self.invoke(&identity, &mut component).await?;
        if invoked.is_some() {
            if let Some(store) = store.as_mut() {
                if let Some(cookie) = store.set(&component).await? {
                    self.add_cookie(cookie);
                }
            }
        }

        Ok(Mounted {
            component,
            identity,
            invoked,
        })
    }

    /// Drops the cached state of `C`.
    ///
    /// Query-mode state lives in the URL and needs no reset.
    pub async fn reset_component<C: Component>(&self) -> DaedalusResult<()> {
        if self.config().component.state == StateMode::Cache {
            let identity = self.component_identity::<C>();
            let mut store = StateStore::load(
                self.cache().clone(),
                self.cookies(),
                identity.as_str(),
                self.client().clone(),
            )
            .await?;
            let cookie = store.reset().await?;
            self.add_cookie(cookie);
        }
        Ok(())
    }

    /// URL invoking `method` on `component`.
    ///
    /// In query mode the component's fields travel along.
    pub fn action<C: Component>(&self, component: &C, method: &str) -> String {
        self.action_with(component, method, std::iter::empty::<(String, String)>())
    }

    /// Like [`action`](Self::action), with extra query arguments.
    pub fn action_with<C, I, K, V>(&self, component: &C, method: &str, args: I) -> String
    where
        C: Component,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let identity = self.component_identity::<C>();
        let (owned, fields) = match self.config().component.state {
            StateMode::Query => {
                let codec = query_codec::<C>();
                let fields = C::fields();
                let owned: Vec<String> = fields.iter().map(|field| codec.key(field)).collect();
                (owned, codec.encode_pairs(component, &fields))
            }
            StateMode::Cache => (Vec::new(), Vec::new()),
        };
        self.generator()
            .action(&identity, method, args, &owned, fields)
    }

    async fn invoke<C: Component>(
        &self,
        identity: &ComponentIdentity,
        component: &mut C,
    ) -> DaedalusResult<Option<String>> {
        let Some(call) = self.query(ACTION_PARAM).and_then(ActionCall::parse) else {
            return Ok(None);
        };
        if !call.targets(identity) {
            return Ok(None);
        }
        let Some(action) = C::actions().get(call.method) else {
            warn!(component = %identity, method = call.method, "unknown component action");
            return Ok(None);
        };

        debug!(component = %identity, method = call.method, "invoking component action");
        action(component, self).await?;
        Ok(Some(call.method.to_string()))
    }
}

fn query_codec<C: Component>() -> QueryCodec {
    QueryCodec::new().with_prefix(C::NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::context_from;
    use daedalus_component::fields;
    use daedalus_config::{ComponentConfig, DaedalusConfig};
    use daedalus_core::{Container, Cookies, DaedalusError, Fingerprint};
    use serde::Deserialize;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct List {
        page: u32,
        sort: String,
        mounted: bool,
    }

    fn next<'a>(list: &'a mut List, _ctx: &'a Context) -> BoxFuture<'a, DaedalusResult<()>> {
        Box::pin(async move {
            list.page += 1;
            Ok(())
        })
    }

    fn fail<'a>(_list: &'a mut List, _ctx: &'a Context) -> BoxFuture<'a, DaedalusResult<()>> {
        Box::pin(async { Err(DaedalusError::validation("page out of range")) })
    }

    impl Component for List {
        const NAME: &'static str = "list";

        fn actions() -> Actions<Self> {
            Actions::new().on("next", next).on("fail", fail)
        }

        fn fields() -> Fields<Self> {
            fields!(List { page, sort })
        }

        fn mount(&mut self, _ctx: &Context) {
            self.mounted = true;
        }
    }

    fn query_mode() -> DaedalusConfig {
        DaedalusConfig::builder()
            .component(ComponentConfig {
                state: StateMode::Query,
            })
            .build()
    }

    fn client(ip: &str) -> Fingerprint {
        Fingerprint {
            lang: String::new(),
            ip: ip.into(),
            user_agent: "test".into(),
        }
    }

    #[test]
    fn test_identity_uses_route_scope() {
        let ctx = context_from(DaedalusConfig::default(), Container::new(), "/blog/7", |_| {});
        assert_eq!(ctx.component_identity::<List>().as_str(), "blog-detail_list");
    }

    #[test]
    fn test_actions_table() {
        let actions = List::actions();
        assert!(actions.get("next").is_some());
        assert!(actions.get("missing").is_none());
        assert_eq!(actions.names().collect::<Vec<_>>(), vec!["next", "fail"]);
    }

    #[tokio::test]
    async fn test_query_mode_restores_and_acts() {
        let ctx = context_from(
            query_mode(),
            Container::new(),
            "/blog/7?action=blog-detail_list_next&list_page=2&list_sort=name",
            |_| {},
        );
        let list = ctx.component(List::default()).await.unwrap();
        assert!(list.mounted);
        assert_eq!(list.page, 3);
        assert_eq!(list.sort, "name");
        assert_eq!(list.invoked(), Some("next"));

        let url = ctx.action(&*list, "next");
        assert_eq!(
            url,
            "/blog/7?action=blog-detail_list_next&list_page=3&list_sort=name"
        );
    }

    #[tokio::test]
    async fn test_action_for_other_component_is_ignored() {
        let ctx = context_from(
            query_mode(),
            Container::new(),
            "/blog/7?action=blog-detail_grid_next&list_page=2",
            |_| {},
        );
        let list = ctx.component(List::default()).await.unwrap();
        assert_eq!(list.page, 2);
        assert_eq!(list.invoked(), None);
    }

    #[tokio::test]
    async fn test_failing_action_propagates() {
        let ctx = context_from(
            query_mode(),
            Container::new(),
            "/blog/7?action=blog-detail_list_fail",
            |_| {},
        );
        let error = ctx.component(List::default()).await.unwrap_err();
        assert_eq!(error.to_string(), "page out of range");
    }

    #[tokio::test]
    async fn test_cache_mode_persists_after_action() {
        let ctx = context_from(
            DaedalusConfig::default(),
            Container::new(),
            "/blog/7?action=blog-detail_list_next",
            |request| request.client = client("10.0.0.1"),
        );
        let list = ctx.component(List::default()).await.unwrap();
        assert_eq!(list.page, 1);

        let cookie = ctx.queued_cookies()[0].clone();
        assert_eq!(cookie.name(), "X-State-blog-detail_list");

        let cookies = Cookies::parse(&format!("{}={}", cookie.name(), cookie.value()));
        let store = StateStore::load(
            ctx.cache().clone(),
            &cookies,
            "blog-detail_list",
            client("10.0.0.1"),
        )
        .await
        .unwrap();
        let saved: List = store.get().unwrap().unwrap();
        assert_eq!(saved.page, 1);
        assert!(saved.mounted);
    }

    #[tokio::test]
    async fn test_cache_mode_without_action_writes_nothing() {
        let ctx = context_from(DaedalusConfig::default(), Container::new(), "/blog/7", |_| {});
        let list = ctx.component(List::default()).await.unwrap();
        assert_eq!(list.page, 0);
        assert!(ctx.queued_cookies().is_empty());
    }

    #[tokio::test]
    async fn test_cache_state_ignored_for_other_client() {
        let ctx = context_from(
            DaedalusConfig::default(),
            Container::new(),
            "/blog/7?action=blog-detail_list_next",
            |request| request.client = client("10.0.0.1"),
        );
        ctx.component(List::default()).await.unwrap();
        let cookie = ctx.queued_cookies()[0].clone();
        let cookies = Cookies::parse(&format!("{}={}", cookie.name(), cookie.value()));

        let store = StateStore::load(
            ctx.cache().clone(),
            &cookies,
            "blog-detail_list",
            client("10.0.0.2"),
        )
        .await
        .unwrap();
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn test_reset_component_removes_cookie() {
        let ctx = context_from(DaedalusConfig::default(), Container::new(), "/blog/7", |_| {});
        ctx.reset_component::<List>().await.unwrap();
        let cookies = ctx.queued_cookies();
        assert!(cookies[0].is_removal());
        assert_eq!(cookies[0].name(), "X-State-blog-detail_list");
    }
}
