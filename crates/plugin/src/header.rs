/// Which of the five pluggable roles a plugin fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginKind {
	Object,
	Semantic,
	Space,
	Format,
	Key,
}

/// Common identity every plugin carries, regardless of role.
#[derive(Debug, Clone)]
pub struct PluginHeader {
	pub kind: PluginKind,
	pub uuid: uuid::Uuid,
	pub label: String,
	pub description: String,
}

impl PluginHeader {
	pub fn new(kind: PluginKind, uuid: uuid::Uuid, label: impl Into<String>, description: impl Into<String>) -> Self {
		Self { kind, uuid, label: label.into(), description: description.into() }
	}
}
