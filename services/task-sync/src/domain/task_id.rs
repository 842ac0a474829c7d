/// Task識別子（ターゲットスキーマの整数ID空間）
///
/// TaskV2は文字列IDを、Taskは整数IDを使用する。
/// 文字列IDからの変換は先頭の数値部分のみを読む方式で、数字が一つもない場合は
/// NaNセンチネルになる。変換失敗はエラーとして扱わない。
use std::fmt;

use bson::Bson;

/// ターゲットコレクションの`_id`
///
/// `NaN`はドキュメントストアのキー比較と同様に自分自身と等しい。
/// 数値でないIDを何度変換しても同じターゲットキーを指す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    /// 整数ID
    Int(i64),
    /// 数値として解釈できなかったID
    NaN,
}

impl TaskId {
    /// 文字列IDの先頭の数値部分を整数として解釈する
    ///
    /// 1. 先頭の空白をスキップ
    /// 2. 符号（`+`/`-`）を一つまで許可
    /// 3. 最初の数字以外の文字で打ち切り
    ///
    /// 数字が一つもない場合、またはi64に収まらない場合は`TaskId::NaN`を返す。
    ///
    /// # 例
    /// - `"42"` → `Int(42)`
    /// - `"42abc"` → `Int(42)`
    /// - `"  -7"` → `Int(-7)`
    /// - `"abc"` → `NaN`
    pub fn parse_leading_int(source_id: &str) -> Self {
        let trimmed = source_id.trim_start();

        let (negative, rest) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let digit_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digit_len == 0 {
            return TaskId::NaN;
        }

        let digits = &rest[..digit_len];
        let parsed = if negative {
            format!("-{}", digits).parse::<i64>()
        } else {
            digits.parse::<i64>()
        };

        parsed.map(TaskId::Int).unwrap_or(TaskId::NaN)
    }

    /// BSON値からTaskIdを復元する
    ///
    /// 整数（Int32/Int64）、整数値のDouble、NaNのDoubleのみ対応。
    pub fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::Int32(n) => Some(TaskId::Int(i64::from(*n))),
            Bson::Int64(n) => Some(TaskId::Int(*n)),
            Bson::Double(f) if f.is_nan() => Some(TaskId::NaN),
            Bson::Double(f) if f.fract() == 0.0 && f.is_finite() => Some(TaskId::Int(*f as i64)),
            _ => None,
        }
    }

    /// 整数値を取得（NaNの場合はNone）
    pub fn as_int(&self) -> Option<i64> {
        match self {
            TaskId::Int(n) => Some(*n),
            TaskId::NaN => None,
        }
    }

    /// NaNセンチネルかどうか
    pub fn is_nan(&self) -> bool {
        matches!(self, TaskId::NaN)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Int(n) => write!(f, "{}", n),
            TaskId::NaN => write!(f, "NaN"),
        }
    }
}

impl From<TaskId> for Bson {
    fn from(id: TaskId) -> Self {
        match id {
            TaskId::Int(n) => Bson::Int64(n),
            TaskId::NaN => Bson::Double(f64::NAN),
        }
    }
}
