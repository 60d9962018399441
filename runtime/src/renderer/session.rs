//! Scoped ownership of the single render context used by a run.
//!
//! A [`RendererSession`] must be released with [`RendererSession::release`].
//! If it is dropped instead (early return, panic unwinding), the context is
//! closed on a background task so the page is not leaked.

use super::{RenderContext, Renderer};
use crate::error::SessionAcquisitionFailure;
use anyhow::Result;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Exclusive handle to one render context.
pub struct RendererSession {
    context: Option<Box<dyn RenderContext>>,
    created_at: Instant,
}

impl RendererSession {
    /// Open a context on `renderer`.
    pub async fn acquire(renderer: &dyn Renderer) -> Result<Self, SessionAcquisitionFailure> {
        let context = renderer
            .new_context()
            .await
            .map_err(|e| SessionAcquisitionFailure::new(format!("{e:#}")))?;
        debug!("renderer session acquired");
        Ok(Self::from_context(context))
    }

    /// Wrap an already-open context.
    pub fn from_context(context: Box<dyn RenderContext>) -> Self {
        Self {
            context: Some(context),
            created_at: Instant::now(),
        }
    }

    /// Get a mutable reference to the render context.
    pub fn context_mut(&mut self) -> Option<&mut (dyn RenderContext + 'static)> {
        self.context.as_deref_mut()
    }

    /// How long the session has been alive.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Close the context.
    pub async fn release(mut self) -> Result<()> {
        match self.context.take() {
            Some(context) => {
                debug!("releasing renderer session after {:?}", self.age());
                context.close().await
            }
            None => Ok(()),
        }
    }
}

impl Drop for RendererSession {
    fn drop(&mut self) {
        let Some(context) = self.context.take() else {
            return;
        };
        warn!("renderer session dropped without release, closing in background");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = context.close().await {
                        warn!("background session close failed: {e:#}");
                    }
                });
            }
            Err(_) => warn!("no runtime available, render context leaked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::scripted::{ScriptedPage, ScriptedSite};

    #[tokio::test]
    async fn test_release_closes_context() {
        let site = ScriptedSite::cfp_like();
        let page = ScriptedPage::new(site.clone());
        let closed = page.closed_flag();
        let session = RendererSession::from_context(Box::new(page));
        session.release().await.unwrap();
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_drop_closes_context_in_background() {
        let site = ScriptedSite::cfp_like();
        let page = ScriptedPage::new(site);
        let closed = page.closed_flag();
        {
            let _session = RendererSession::from_context(Box::new(page));
        }
        for _ in 0..50 {
            if closed.load(std::sync::atomic::Ordering::SeqCst) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
    }
}
