// MongoDB実装のTaskDatabase
//
// ステージ記述子を集約パイプラインのBSONステージに変換し、公式ドライバーで実行する。
// ToTaskId変換は$regexFind + $convertで先頭数値解釈を再現する。

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{Client, Database};
use tracing::debug;

use super::config::MongoConfig;
use super::database::{DatabaseError, DeleteResult, PipelineResult, TaskDatabase};
use crate::domain::{FieldTransform, Pipeline, Stage, TaskId};

/// 先頭数値部分（符号付き）にマッチする正規表現
const LEADING_INT_REGEX: &str = "^[+-]?[0-9]+";

/// MongoDBのTaskDatabase実装
///
/// `Database`ハンドルは内部でコネクションプールを共有しており、クローンは安価。
#[derive(Debug, Clone)]
pub struct MongoTaskDatabase {
    database: Database,
}

impl MongoTaskDatabase {
    /// 既存のDatabaseハンドルから作成
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// 設定に従ってMongoDBへ接続
    pub async fn connect(config: &MongoConfig) -> Result<Self, DatabaseError> {
        let client = Client::with_uri_str(config.uri())
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        let database = client.database(&config.collections().database);
        debug!(database = database.name(), "MongoDBクライアントを初期化");

        Ok(Self::new(database))
    }

    /// Databaseハンドルへの参照を取得
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// ステージ記述子をBSONステージに変換
    pub fn render_pipeline(pipeline: &Pipeline) -> Vec<Document> {
        pipeline.stages().iter().map(Self::render_stage).collect()
    }

    fn render_stage(stage: &Stage) -> Document {
        match stage {
            Stage::Match { field, value } => doc! {
                "$match": { field.as_str(): Bson::from(value) }
            },
            Stage::AddFields { field, transform } => doc! {
                "$addFields": { field.as_str(): Self::render_transform(field, transform) }
            },
            Stage::Merge { into, on } => doc! {
                "$merge": {
                    "into": into.as_str(),
                    "on": on.as_str(),
                    "whenMatched": "replace",
                    "whenNotMatched": "insert",
                }
            },
        }
    }

    /// フィールド変換を集約式に変換
    ///
    /// 文字列化 → 先頭空白除去 → 先頭数値部分の抽出 → `+`除去 → long変換。
    /// 抽出できない場合・範囲外の場合はNaN。
    fn render_transform(field: &str, transform: &FieldTransform) -> Bson {
        match transform {
            FieldTransform::ToTaskId => Bson::Document(doc! {
                "$let": {
                    "vars": {
                        "prefix": {
                            "$regexFind": {
                                "input": { "$ltrim": { "input": { "$toString": format!("${}", field) } } },
                                "regex": LEADING_INT_REGEX,
                            }
                        }
                    },
                    "in": {
                        "$convert": {
                            "input": { "$ltrim": { "input": "$$prefix.match", "chars": "+" } },
                            "to": "long",
                            "onError": f64::NAN,
                            "onNull": f64::NAN,
                        }
                    }
                }
            }),
        }
    }
}

#[async_trait]
impl TaskDatabase for MongoTaskDatabase {
    async fn delete_one(
        &self,
        collection: &str,
        id: TaskId,
    ) -> Result<DeleteResult, DatabaseError> {
        let result = self
            .database
            .collection::<Document>(collection)
            .delete_one(doc! { "_id": Bson::from(id) })
            .await
            .map_err(|e| DatabaseError::DeleteError(e.to_string()))?;

        Ok(DeleteResult {
            deleted_count: result.deleted_count,
        })
    }

    async fn run_pipeline(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> Result<PipelineResult, DatabaseError> {
        let stages = Self::render_pipeline(pipeline);
        debug!(collection = collection, stage_count = stages.len(), "パイプライン実行");

        let cursor = self
            .database
            .collection::<Document>(collection)
            .aggregate(stages)
            .await
            .map_err(|e| DatabaseError::PipelineError(e.to_string()))?;

        // $mergeを含むパイプラインのカーソルは空
        let _: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| DatabaseError::PipelineError(e.to_string()))?;

        Ok(PipelineResult { merged_count: None })
    }
}
