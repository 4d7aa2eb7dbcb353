//! Drop resolution and the current selection
//!
//! A drop event hands us one provider per dragged item. Each provider is
//! resolved to a file-system path, then filtered: the input target only
//! keeps `.m4a` files, the output target only keeps a directory. Every
//! rejected item is returned with a reason so callers can report it.

use std::fmt;
use std::path::{Path, PathBuf};

use futures::future::{BoxFuture, FutureExt, join_all};

/// Extension accepted on the input drop target
pub const INPUT_EXTENSION: &str = "m4a";

/// One dragged item
///
/// Resolution is asynchronous so providers backed by slow sources
/// (promised files, network volumes) fit the same shape.
pub trait ItemProvider: Send + Sync {
    /// Whether this item can produce a file-system reference at all
    fn can_load_file_reference(&self) -> bool;

    /// Resolve the item to an absolute path
    fn load_file_reference(&self) -> BoxFuture<'_, Result<PathBuf, String>>;

    /// Short description for logs and rejection reports
    fn describe(&self) -> String;
}

/// A path dropped from the file manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedPath(PathBuf);

impl DroppedPath {
    pub fn providers(paths: &[PathBuf]) -> Vec<Box<dyn ItemProvider>> {
        paths
            .iter()
            .map(|p| Box::new(DroppedPath(p.clone())) as Box<dyn ItemProvider>)
            .collect()
    }
}

impl ItemProvider for DroppedPath {
    fn can_load_file_reference(&self) -> bool {
        true
    }

    fn load_file_reference(&self) -> BoxFuture<'_, Result<PathBuf, String>> {
        async move {
            std::path::absolute(&self.0)
                .map_err(|e| format!("Failed to resolve {}: {}", self.0.display(), e))
        }
        .boxed()
    }

    fn describe(&self) -> String {
        self.0.display().to_string()
    }
}

/// Why a dropped item was not accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The provider cannot produce a file reference (e.g. plain text)
    NotAFileReference,
    /// The provider failed to resolve
    Unresolvable(String),
    /// Resolved, but it is not a regular file (directory, missing, ...)
    NotAFile,
    /// A file, but not an `.m4a`
    WrongExtension,
    /// Dropped on the output target but not a directory
    NotADirectory,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotAFileReference => write!(f, "not a file"),
            RejectReason::Unresolvable(e) => write!(f, "could not be resolved: {}", e),
            RejectReason::NotAFile => write!(f, "not a regular file"),
            RejectReason::WrongExtension => write!(f, "not an .{} file", INPUT_EXTENSION),
            RejectReason::NotADirectory => write!(f, "not a folder"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedItem {
    pub description: String,
    pub reason: RejectReason,
}

/// Result of resolving one drop event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropResolution<T> {
    pub accepted: T,
    pub rejected: Vec<RejectedItem>,
}

impl<T> DropResolution<T> {
    fn log_rejections(&self, target: &str) {
        for item in &self.rejected {
            log::info!("Ignored drop on {}: {} ({})", target, item.description, item.reason);
        }
    }
}

fn has_input_extension(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(INPUT_EXTENSION)
}

/// Resolve a drop on the input target
///
/// All providers are resolved together and the future completes only once
/// every one of them has, so the caller always sees the whole drop. Order
/// of the accepted paths follows provider order.
pub async fn resolve_input_drop(
    providers: &[Box<dyn ItemProvider>],
) -> DropResolution<Vec<PathBuf>> {
    let resolutions = join_all(providers.iter().map(|provider| async move {
        if !provider.can_load_file_reference() {
            return Err(RejectReason::NotAFileReference);
        }
        let path = provider
            .load_file_reference()
            .await
            .map_err(RejectReason::Unresolvable)?;
        if !std::fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false) {
            return Err(RejectReason::NotAFile);
        }
        if !has_input_extension(&path) {
            return Err(RejectReason::WrongExtension);
        }
        Ok(path)
    }))
    .await;

    let mut resolution = DropResolution {
        accepted: Vec::new(),
        rejected: Vec::new(),
    };
    for (provider, outcome) in providers.iter().zip(resolutions) {
        match outcome {
            Ok(path) => resolution.accepted.push(path),
            Err(reason) => resolution.rejected.push(RejectedItem {
                description: provider.describe(),
                reason,
            }),
        }
    }

    log::debug!("Input drop resolved to {} files", resolution.accepted.len());
    resolution.log_rejections("input");
    resolution
}

/// Resolve a drop on the output target
///
/// Only the first provider that can produce a file reference is used.
pub async fn resolve_output_drop(
    providers: &[Box<dyn ItemProvider>],
) -> DropResolution<Option<PathBuf>> {
    let mut resolution = DropResolution {
        accepted: None,
        rejected: Vec::new(),
    };

    let Some(provider) = providers.iter().find(|p| p.can_load_file_reference()) else {
        resolution.rejected = providers
            .iter()
            .map(|p| RejectedItem {
                description: p.describe(),
                reason: RejectReason::NotAFileReference,
            })
            .collect();
        resolution.log_rejections("output");
        return resolution;
    };

    match provider.load_file_reference().await {
        Ok(path) if std::fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false) => {
            log::debug!("Output folder resolved to {}", path.display());
            resolution.accepted = Some(path);
        }
        Ok(_) => resolution.rejected.push(RejectedItem {
            description: provider.describe(),
            reason: RejectReason::NotADirectory,
        }),
        Err(e) => resolution.rejected.push(RejectedItem {
            description: provider.describe(),
            reason: RejectReason::Unresolvable(e),
        }),
    }

    resolution.log_rejections("output");
    resolution
}

/// The files to convert and where to put them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    inputs: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
}

impl Selection {
    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    /// Each drop replaces the whole input list; drops are not additive
    pub fn replace_inputs(&mut self, inputs: Vec<PathBuf>) {
        self.inputs = inputs;
    }

    pub fn set_output_dir(&mut self, dir: PathBuf) {
        self.output_dir = Some(dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn path(path: impl Into<PathBuf>) -> Box<dyn ItemProvider> {
        Box::new(DroppedPath(path.into()))
    }

    fn text(text: &str) -> Box<dyn ItemProvider> {
        Box::new(TextItem(text.to_string()))
    }

    /// Plain text dragged in from another app; never a file reference
    struct TextItem(String);

    impl ItemProvider for TextItem {
        fn can_load_file_reference(&self) -> bool {
            false
        }

        fn load_file_reference(&self) -> BoxFuture<'_, Result<PathBuf, String>> {
            async { Err("Text is not a file reference".to_string()) }.boxed()
        }

        fn describe(&self) -> String {
            format!("text {:?}", self.0)
        }
    }

    /// Provider that resolves after a delay, to shuffle completion order
    struct DelayedProvider {
        path: PathBuf,
        delay_ms: u64,
    }

    impl ItemProvider for DelayedProvider {
        fn can_load_file_reference(&self) -> bool {
            true
        }

        fn load_file_reference(&self) -> BoxFuture<'_, Result<PathBuf, String>> {
            async move {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
                Ok(self.path.clone())
            }
            .boxed()
        }

        fn describe(&self) -> String {
            self.path.display().to_string()
        }
    }

    /// Provider whose resolution fails
    struct BrokenProvider;

    impl ItemProvider for BrokenProvider {
        fn can_load_file_reference(&self) -> bool {
            true
        }

        fn load_file_reference(&self) -> BoxFuture<'_, Result<PathBuf, String>> {
            async { Err("promise was revoked".to_string()) }.boxed()
        }

        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    #[tokio::test]
    async fn test_input_drop_keeps_only_m4a_files() {
        let dir = tempfile::tempdir().unwrap();
        let song = dir.path().join("song.m4a");
        let wav = dir.path().join("take.wav");
        std::fs::write(&song, b"").unwrap();
        std::fs::write(&wav, b"").unwrap();

        let resolution = resolve_input_drop(&[path(song.clone()), path(wav)]).await;

        assert_eq!(resolution.accepted, vec![song]);
        assert_eq!(resolution.rejected.len(), 1);
        assert_eq!(resolution.rejected[0].reason, RejectReason::WrongExtension);
    }

    #[tokio::test]
    async fn test_input_drop_rejects_text() {
        let resolution = resolve_input_drop(&[text("song.m4a")]).await;

        assert!(resolution.accepted.is_empty());
        assert_eq!(resolution.rejected[0].reason, RejectReason::NotAFileReference);
    }

    #[tokio::test]
    async fn test_input_drop_rejects_directories_named_like_audio() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("album.m4a");
        std::fs::create_dir(&folder).unwrap();

        let resolution = resolve_input_drop(&[path(folder)]).await;

        assert!(resolution.accepted.is_empty());
        assert_eq!(resolution.rejected[0].reason, RejectReason::NotAFile);
    }

    #[tokio::test]
    async fn test_input_drop_extension_is_case_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        let upper = dir.path().join("LOUD.M4A");
        std::fs::write(&upper, b"").unwrap();

        let resolution = resolve_input_drop(&[path(upper)]).await;

        assert!(resolution.accepted.is_empty());
        assert_eq!(resolution.rejected[0].reason, RejectReason::WrongExtension);
    }

    #[tokio::test]
    async fn test_input_drop_preserves_order_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.m4a");
        let b = dir.path().join("b.m4a");
        std::fs::write(&a, b"").unwrap();
        std::fs::write(&b, b"").unwrap();

        // b resolves last but was dropped first
        let items: Vec<Box<dyn ItemProvider>> = vec![
            Box::new(DelayedProvider { path: b.clone(), delay_ms: 40 }),
            Box::new(DelayedProvider { path: a.clone(), delay_ms: 0 }),
            Box::new(DelayedProvider { path: b.clone(), delay_ms: 10 }),
        ];

        let resolution = resolve_input_drop(&items).await;

        assert_eq!(resolution.accepted, vec![b.clone(), a, b]);
        assert!(resolution.rejected.is_empty());
    }

    #[tokio::test]
    async fn test_input_drop_reports_unresolvable_provider() {
        let items: Vec<Box<dyn ItemProvider>> = vec![Box::new(BrokenProvider)];

        let resolution = resolve_input_drop(&items).await;

        assert!(resolution.accepted.is_empty());
        assert_eq!(
            resolution.rejected[0].reason,
            RejectReason::Unresolvable("promise was revoked".to_string())
        );
    }

    #[tokio::test]
    async fn test_input_drop_resolves_relative_paths() {
        let resolution = resolve_input_drop(&[path("missing.m4a")]).await;

        // Missing on disk, so rejected, but the description stays readable
        assert_eq!(resolution.rejected[0].reason, RejectReason::NotAFile);
        assert_eq!(resolution.rejected[0].description, "missing.m4a");
    }

    #[tokio::test]
    async fn test_output_drop_accepts_directory() {
        let dir = tempfile::tempdir().unwrap();

        let resolution = resolve_output_drop(&[path(dir.path())]).await;

        assert_eq!(resolution.accepted.as_deref(), Some(dir.path()));
        assert!(resolution.rejected.is_empty());
    }

    #[tokio::test]
    async fn test_output_drop_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, b"").unwrap();

        let resolution = resolve_output_drop(&[path(file)]).await;

        assert_eq!(resolution.accepted, None);
        assert_eq!(resolution.rejected[0].reason, RejectReason::NotADirectory);
    }

    #[tokio::test]
    async fn test_output_drop_uses_first_file_reference() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();

        let resolution = resolve_output_drop(&[
            text("hello"),
            path(first.path()),
            path(second.path()),
        ])
        .await;

        assert_eq!(resolution.accepted.as_deref(), Some(first.path()));
    }

    #[tokio::test]
    async fn test_output_drop_with_only_text() {
        let resolution = resolve_output_drop(&[text("x")]).await;

        assert_eq!(resolution.accepted, None);
        assert_eq!(resolution.rejected[0].reason, RejectReason::NotAFileReference);
    }

    #[test]
    fn test_selection_replaces_inputs() {
        let mut selection = Selection::default();
        selection.replace_inputs(vec![PathBuf::from("/a.m4a"), PathBuf::from("/b.m4a")]);
        selection.replace_inputs(vec![PathBuf::from("/c.m4a")]);

        assert_eq!(selection.inputs(), &[PathBuf::from("/c.m4a")]);
    }

    #[test]
    fn test_selection_output_dir_is_overwritten() {
        let mut selection = Selection::default();
        assert!(selection.output_dir().is_none());

        selection.set_output_dir(PathBuf::from("/one"));
        selection.set_output_dir(PathBuf::from("/two"));

        assert_eq!(selection.output_dir(), Some(Path::new("/two")));
    }
}
