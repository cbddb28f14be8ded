use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::assertion::AssertionRule;
use crate::collection::{RequestCollection, RequestSpec};
use crate::config::ClientConfig;
use crate::http::{Client, TransportFailure, WireRequest};
use crate::runner::types::{CollectionReport, Outcome, RequestReport};
use crate::{Result, RqstrError};

/// 执行器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// 尚未发出任何请求
    Idle,
    Running,
    /// 所有尝试都已得到结果
    Completed,
    /// 客户端创建失败或被取消，没有产出报告
    Aborted,
}

/// 集合执行器
///
/// 每次执行创建一个共享客户端，执行结束（无论成功、失败还是取消）时释放。
pub struct CollectionRunner {
    config: ClientConfig,
    state: RunState,
}

impl CollectionRunner {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            state: RunState::Idle,
        }
    }

    /// 最近一次执行所处的状态
    pub fn state(&self) -> RunState {
        self.state
    }

    /// 执行集合中的所有请求
    pub async fn execute(&mut self, collection: &RequestCollection) -> Result<CollectionReport> {
        self.execute_until(collection, std::future::pending::<()>())
            .await
    }

    /// 执行集合，`cancel` 先完成时放弃所有在途请求并返回 `Cancelled`
    pub async fn execute_until<F>(
        &mut self,
        collection: &RequestCollection,
        cancel: F,
    ) -> Result<CollectionReport>
    where
        F: Future<Output = ()>,
    {
        self.transition(RunState::Running);

        let client = match Client::new(&self.config) {
            Ok(client) => client,
            Err(e) => {
                self.transition(RunState::Aborted);
                return Err(e);
            }
        };
        let limiter = self.config.max_in_flight.map(|n| Arc::new(Semaphore::new(n.max(1))));

        info!(
            "Running {} requests from '{}'",
            collection.len(),
            collection.title
        );
        let start = Instant::now();

        let work = join_all(
            collection
                .requests
                .iter()
                .map(|spec| run_request(&client, limiter.as_deref(), collection, spec)),
        );

        let outcome = tokio::select! {
            biased;
            () = cancel => Err(RqstrError::Cancelled),
            requests = work => Ok(requests),
        };
        // 在途请求随 work 一起被丢弃，这里释放连接池
        drop(client);

        match outcome {
            Ok(requests) => {
                self.transition(RunState::Completed);
                Ok(CollectionReport {
                    title: collection.title.clone(),
                    requests,
                    elapsed: start.elapsed(),
                })
            }
            Err(e) => {
                warn!("Execution of '{}' was cancelled", collection.title);
                self.transition(RunState::Aborted);
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!("Runner state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// 解析继承关系、构造并发送单个请求的全部尝试
async fn run_request(
    client: &Client,
    limiter: Option<&Semaphore>,
    collection: &RequestCollection,
    spec: &RequestSpec,
) -> RequestReport {
    let attempts = spec.attempts();

    let (url, outcomes) = match collection.wire_request(spec) {
        Ok(wire) => {
            debug!(
                "Dispatching '{}' {} x{} (auth: {})",
                spec.name,
                wire,
                attempts,
                collection.effective_auth(spec).scheme()
            );
            let outcomes = dispatch(client, &wire, &spec.assert, attempts, limiter).await;
            (wire.url.to_string(), outcomes)
        }
        Err(e) => {
            // 单个请求定义错误不影响其他请求
            warn!("Request '{}' could not be built: {}", spec.name, e);
            let outcome = Outcome::transport(TransportFailure::from(&e));
            (spec.url.clone(), vec![outcome; attempts])
        }
    };

    RequestReport {
        name: spec.name.clone(),
        method: spec.method.to_uppercase(),
        url,
        attempts: outcomes,
    }
}

/// 并发发送 `attempts` 次同一请求，结果与发起顺序一一对应
pub async fn dispatch(
    client: &Client,
    request: &WireRequest,
    rule: &AssertionRule,
    attempts: usize,
    limiter: Option<&Semaphore>,
) -> Vec<Outcome> {
    let calls = (0..attempts.max(1)).map(|attempt| async move {
        let _permit = match limiter {
            Some(semaphore) => semaphore.acquire().await.ok(),
            None => None,
        };
        match client.execute(request).await {
            Ok(response) => {
                debug!(
                    "{} attempt {} -> {} in {}ms",
                    request,
                    attempt + 1,
                    response.status.code(),
                    response.duration.as_millis()
                );
                Outcome::received(response, rule)
            }
            Err(failure) => {
                warn!(
                    "{} attempt {} failed ({}): {}",
                    request,
                    attempt + 1,
                    failure.kind,
                    failure.description
                );
                Outcome::transport(failure)
            }
        }
    });
    join_all(calls).await
}
