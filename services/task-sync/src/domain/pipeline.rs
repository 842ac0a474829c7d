//! 集約パイプラインのステージ記述子
//!
//! ソースレコードの再読み込み → `_id`変換 → ターゲットへのマージ、という
//! データフローを型付きのステージ列として表現する。
//! 実行はデータベース側（TaskDatabase実装）が行い、ステージの順序と意味は変えない。

use super::source_id::SourceId;
use super::task_id::TaskId;

/// ドキュメントの`_id`フィールド名
pub const ID_FIELD: &str = "_id";

/// フィールド変換
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTransform {
    /// 文字列値を先頭数値解釈でTaskIdに変換する（`TaskId::parse_leading_int`と同じ規則）
    ToTaskId,
}

impl FieldTransform {
    /// 文字列値に変換を適用
    pub fn apply(&self, value: &str) -> TaskId {
        match self {
            FieldTransform::ToTaskId => TaskId::parse_leading_int(value),
        }
    }
}

/// パイプラインのステージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// 指定フィールドがIDと一致するドキュメントのみを通す（型も一致が必要）
    Match { field: String, value: SourceId },
    /// 指定フィールドを変換結果で上書きする（他のフィールドはそのまま）
    AddFields {
        field: String,
        transform: FieldTransform,
    },
    /// `on`フィールドをキーに`into`コレクションへupsertする
    ///
    /// 一致するドキュメントがあれば全フィールドを置換、なければ挿入。
    Merge { into: String, on: String },
}

/// 集約パイプライン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// 任意のステージ列からパイプラインを作成
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// ソースレコードをターゲットコレクションへコピーするパイプライン
    ///
    /// 1. `_id == source_id`のソースレコードを選択（イベントのペイロードではなく現在の状態を読む）
    /// 2. `_id`を整数IDへ変換
    /// 3. ターゲットコレクションへ`_id`でマージ
    pub fn copy_to_target(source_id: &SourceId, target_collection: &str) -> Self {
        Self::new(vec![
            Stage::Match {
                field: ID_FIELD.to_string(),
                value: source_id.clone(),
            },
            Stage::AddFields {
                field: ID_FIELD.to_string(),
                transform: FieldTransform::ToTaskId,
            },
            Stage::Merge {
                into: target_collection.to_string(),
                on: ID_FIELD.to_string(),
            },
        ])
    }

    /// ステージ列を取得
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// マージ先のコレクション名（Mergeステージがない場合はNone）
    pub fn merge_target(&self) -> Option<&str> {
        self.stages.iter().find_map(|stage| match stage {
            Stage::Merge { into, .. } => Some(into.as_str()),
            _ => None,
        })
    }
}
