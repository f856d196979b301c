//! Loading and saving the persisted workspace for a command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use aiqx_catalog::config::{load_config_from, AiqxConfig};
use aiqx_core::session::CURRENT_TIER_KEY;
use aiqx_core::store::{FileStore, KvStore};
use aiqx_core::{Session, Workspace};

/// Global command-line options.
pub struct Options {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

/// Everything a command works on, loaded from the data directory.
pub struct App {
    pub config: AiqxConfig,
    pub store: FileStore,
    pub workspace: Workspace,
    pub session: Session,
}

impl App {
    pub fn open(opts: &Options) -> Result<Self> {
        let mut config = load_config_from(opts.config.as_deref())?;
        if let Some(dir) = &opts.data_dir {
            config.data_dir = dir.clone();
        }

        let store = FileStore::new(config.data_dir.clone());
        let workspace = Workspace::load(&store)
            .with_context(|| format!("failed to load workspace from {}", store.dir().display()))?;
        let mut session = Session::load(&store, &workspace)?;
        if store.get(CURRENT_TIER_KEY)?.is_none() {
            session.tier = config.default_tier;
        }
        tracing::debug!(data_dir = %store.dir().display(), models = workspace.models.len(), "workspace loaded");

        Ok(Self {
            config,
            store,
            workspace,
            session,
        })
    }

    pub fn save(&self) -> Result<()> {
        self.workspace.save(&self.store)?;
        self.session.save(&self.store)?;
        Ok(())
    }

    /// `name`, or the current model when `None`.
    pub fn model_or_current(&self, name: Option<String>) -> Result<String> {
        name.or_else(|| self.session.model.clone())
            .context("no model selected; pass --model or run `aiqx model select`")
    }
}
