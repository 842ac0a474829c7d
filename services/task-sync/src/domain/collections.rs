/// 同期対象のデータベース・コレクション名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionNames {
    /// データベース名
    pub database: String,
    /// ソースコレクション（文字列ID）
    pub source: String,
    /// ターゲットコレクション（整数ID）
    pub target: String,
}

impl CollectionNames {
    pub const DEFAULT_DATABASE: &'static str = "ExampleDB";
    pub const DEFAULT_SOURCE: &'static str = "TaskV2";
    pub const DEFAULT_TARGET: &'static str = "Task";

    pub fn new(
        database: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            source: source.into(),
            target: target.into(),
        }
    }
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_DATABASE,
            Self::DEFAULT_SOURCE,
            Self::DEFAULT_TARGET,
        )
    }
}
