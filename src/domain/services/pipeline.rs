// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::failure::JobFailure;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// 流水线状态预言机特质
///
/// 多步流水线的任务类通过它判断某次运行（或某一步）是否已经终结。
/// 运行已经越过失败任务想到达的位置时，重试是无效甚至有害的。
#[async_trait]
pub trait PipelineStateOracle: Send + Sync {
    /// 该次运行是否已终结
    async fn pipeline_terminal(&self, run_id: Uuid) -> bool;
    /// 该次运行中指定步骤是否已终结
    async fn step_terminal(&self, run_id: Uuid, step: &str) -> bool;
}

/// 领域状态探针特质
///
/// 承载任务的业务记录往往自带处理状态字段（如帖子的处理状态），
/// 作为除队列后端之外的又一在途信号。
#[async_trait]
pub trait DomainStatusProbe: Send + Sync {
    /// 返回业务记录当前的处理状态（小写），无法判断时返回 `None`
    async fn processing_status(&self, failure: &JobFailure) -> Option<String>;
}

/// 任务类描述符
///
/// 入队侧注册的类型化描述，取代对参数包的运行时反射
#[derive(Clone)]
pub struct JobClassDescriptor {
    /// 任务类名
    pub name: String,
    /// 默认队列
    pub queue: String,
    /// 所属流水线步骤名（非流水线任务为 `None`）
    pub pipeline_step: Option<String>,
    /// 流水线状态预言机
    pub oracle: Option<Arc<dyn PipelineStateOracle>>,
}

/// 任务类注册表
///
/// 重试编排器由此解析任务类；未注册的类不可重试
#[derive(Default)]
pub struct JobClassRegistry {
    classes: DashMap<String, JobClassDescriptor>,
}

impl JobClassRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self {
            classes: DashMap::new(),
        }
    }

    /// 注册任务类
    pub fn register(&self, descriptor: JobClassDescriptor) {
        self.classes.insert(descriptor.name.clone(), descriptor);
    }

    /// 解析任务类
    pub fn resolve(&self, name: &str) -> Option<JobClassDescriptor> {
        self.classes.get(name).map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_resolves_registered_class() {
        let registry = JobClassRegistry::new();
        registry.register(JobClassDescriptor {
            name: "MediaEncodeJob".to_string(),
            queue: "media".to_string(),
            pipeline_step: Some("encode".to_string()),
            oracle: None,
        });

        let descriptor = registry.resolve("MediaEncodeJob").expect("registered");
        assert_eq!(descriptor.queue, "media");
        assert_eq!(descriptor.pipeline_step.as_deref(), Some("encode"));
        assert!(registry.resolve("UnknownJob").is_none());
    }
}
