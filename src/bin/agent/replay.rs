use async_trait::async_trait;
use phone_pilot::{HostError, Screenshot, UiHost, UiNode};
use std::path::Path;
use tracing::info;

/// Serves one recorded window tree and logs the operations it is asked to
/// perform instead of touching a device.
pub struct ReplayHost {
    snapshot: UiNode,
}

impl ReplayHost {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| anyhow::anyhow!("cannot open snapshot {}: {}", path.display(), e))?;
        let snapshot: UiNode = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(Self { snapshot })
    }

    pub fn snapshot(&self) -> &UiNode {
        &self.snapshot
    }
}

fn label(node: &UiNode) -> &str {
    node.text()
        .or(node.desc())
        .or(node.short_id())
        .unwrap_or(&node.class_name)
}

#[async_trait]
impl UiHost for ReplayHost {
    async fn capture_snapshot(&self) -> Result<UiNode, HostError> {
        Ok(self.snapshot.clone())
    }

    async fn capture_screenshot(&self) -> Result<Screenshot, HostError> {
        Err(HostError::Screenshot("replay host has no screen".to_string()))
    }

    async fn click(&self, node: &UiNode) -> bool {
        info!("[replay] click '{}'", label(node));
        true
    }

    async fn set_text(&self, node: &UiNode, text: &str) -> bool {
        info!("[replay] set text '{}' on '{}'", text, label(node));
        true
    }

    async fn scroll_forward(&self, node: &UiNode) -> bool {
        info!("[replay] scroll forward '{}'", label(node));
        true
    }

    async fn scroll_backward(&self, node: &UiNode) -> bool {
        info!("[replay] scroll backward '{}'", label(node));
        true
    }

    async fn global_back(&self) -> bool {
        info!("[replay] back");
        true
    }

    async fn launch_app(&self, package: &str) -> bool {
        info!("[replay] launch {}", package);
        true
    }
}
