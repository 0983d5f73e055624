//! # NavSetRoot
//!
//! A trigger element placed inside a page. When a child of it is clicked it
//! asks the closest navigator to replace its root with `url` or `component`.

use log::debug;

use crate::core::ids::ViewId;
use crate::core::nav::{NavError, NavHost, NavResult};
use crate::core::view::{ComponentRef, NavParams};

#[derive(Debug, Clone, Default)]
pub struct NavSetRoot {
    pub component: Option<ComponentRef>,
    pub url: Option<String>,
    pub data: NavParams,
    /// View the trigger is rendered in.
    pub host_view: Option<ViewId>,
}

impl NavSetRoot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn component(mut self, component: ComponentRef) -> Self {
        self.component = Some(component);
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn data(mut self, data: NavParams) -> Self {
        self.data = data;
        self
    }

    pub fn mounted_in(mut self, view: ViewId) -> Self {
        self.host_view = Some(view);
        self
    }

    /// The url wins over the component when both are set.
    pub fn target(&self) -> Option<ComponentRef> {
        self.url
            .clone()
            .map(ComponentRef::Url)
            .or_else(|| self.component.clone())
    }

    /// Handles a bubbled `child:click`.
    ///
    /// Resolves to `Ok(None)` when there is no enclosing navigator or nothing
    /// to navigate to.
    pub async fn on_child_click(&self, host: &NavHost) -> Result<Option<NavResult>, NavError> {
        let Some(nav) = self.host_view.and_then(|view| host.closest_nav(view)) else {
            debug!("set-root click without an enclosing navigator");
            return Ok(None);
        };
        let Some(target) = self.target() else {
            debug!("set-root click without a target");
            return Ok(None);
        };
        host.set_root(nav, target, self.data.clone()).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::nav::NavOptions;
    use crate::test_support::test_host;

    #[tokio::test]
    async fn test_no_ancestor_resolves_to_none() {
        let (host, _) = test_host();
        let trigger = NavSetRoot::new().component(ComponentRef::named("home"));
        assert_eq!(trigger.on_child_click(&host).await, Ok(None));

        // Mounted in a view the host does not know
        let trigger = trigger.mounted_in(ViewId(9999));
        assert_eq!(trigger.on_child_click(&host).await, Ok(None));
    }

    #[tokio::test]
    async fn test_click_replaces_enclosing_root() {
        let (host, _) = test_host();
        let nav = host.create_nav(NavOptions::default()).unwrap();
        let first = host
            .push(nav, ComponentRef::named("list"), NavParams::new())
            .await
            .unwrap()
            .entering
            .unwrap();

        let trigger = NavSetRoot::new()
            .url("/settings")
            .component(ComponentRef::named("ignored"))
            .data(NavParams::new().with("tab", "general"))
            .mounted_in(first);

        let result = trigger.on_child_click(&host).await.unwrap().unwrap();
        let root = result.entering.unwrap();
        assert_eq!(host.get_views(nav), vec![root]);

        let view = host.view(root).unwrap();
        assert_eq!(view.component, ComponentRef::url("/settings"));
        assert_eq!(view.params.get("tab"), Some(&serde_json::Value::from("general")));
    }

    #[tokio::test]
    async fn test_nothing_to_push_resolves_to_none() {
        let (host, _) = test_host();
        let nav = host.create_nav(NavOptions::default()).unwrap();
        let first = host
            .push(nav, ComponentRef::named("list"), NavParams::new())
            .await
            .unwrap()
            .entering
            .unwrap();

        let trigger = NavSetRoot::new().mounted_in(first);
        assert_eq!(trigger.on_child_click(&host).await, Ok(None));
        assert_eq!(host.len(nav), 1);
    }
}
