use std::{fmt, sync::Arc};

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::{address::Address, Error, Result};

/// A unit of connection processing, looked up by name inside a [`Pipeline`].
#[async_trait]
pub trait Stage: Send + Sync {
    /// Opens a stream to `target`. Stages behind this one are reached
    /// through `next`.
    async fn connect(&self, target: &Address, next: Next<'_>) -> Result<TcpStream>;
}

/// Called for every freshly assembled pipeline, before it is used.
pub trait PipelineHandler: Send + Sync {
    fn on_pipeline(&self, pipeline: &mut Pipeline) -> Result<()>;
}

struct NamedStage {
    name: String,
    stage: Box<dyn Stage>,
}

/// The remaining stages of a pipeline.
pub struct Next<'a> {
    stages: &'a [NamedStage],
}

impl<'a> Next<'a> {
    pub async fn connect(self, target: &Address) -> Result<TcpStream> {
        match self.stages.split_first() {
            Some((head, rest)) => head.stage.connect(target, Next { stages: rest }).await,
            None => connect_tcp(target).await,
        }
    }
}

async fn connect_tcp(target: &Address) -> Result<TcpStream> {
    let stream = match target {
        Address::SocketAddr(addr) => TcpStream::connect(addr).await?,
        Address::Domain(domain, port) => TcpStream::connect((domain.as_str(), *port)).await?,
    };
    Ok(stream)
}

/// Ordered stages of a single outbound connection. The head stage sees the
/// connect request first.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<NamedStage>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.names())
            .finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline { stages: Vec::new() }
    }

    pub fn add_first(&mut self, name: impl Into<String>, stage: impl Stage + 'static) -> Result<()> {
        let stage = self.named(name.into(), stage)?;
        self.stages.insert(0, stage);
        Ok(())
    }

    pub fn add_last(&mut self, name: impl Into<String>, stage: impl Stage + 'static) -> Result<()> {
        let stage = self.named(name.into(), stage)?;
        self.stages.push(stage);
        Ok(())
    }

    fn named(&self, name: String, stage: impl Stage + 'static) -> Result<NamedStage> {
        if self.contains(&name) {
            return Err(Error::DuplicateStage(name));
        }
        Ok(NamedStage {
            name,
            stage: Box::new(stage),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stages.iter().any(|s| s.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Stage> {
        self.stages
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.stage.as_ref())
    }

    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Stage>> {
        let index = self.stages.iter().position(|s| s.name == name)?;
        Some(self.stages.remove(index).stage)
    }

    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub async fn connect(&self, target: &Address) -> Result<TcpStream> {
        Next {
            stages: &self.stages,
        }
        .connect(target)
        .await
    }
}

/// Builds a fresh pipeline for every outbound connection and lets each
/// registered handler shape it.
#[derive(Clone, Default)]
pub struct Connector {
    handlers: Vec<Arc<dyn PipelineHandler>>,
}

impl Connector {
    pub fn new() -> Self {
        Connector {
            handlers: Vec::new(),
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn PipelineHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn pipeline(&self) -> Result<Pipeline> {
        let mut pipeline = Pipeline::new();
        for handler in &self.handlers {
            handler.on_pipeline(&mut pipeline)?;
        }
        Ok(pipeline)
    }

    pub async fn connect(&self, target: &Address) -> Result<TcpStream> {
        let pipeline = self.pipeline()?;
        tracing::debug!("connecting to {} via {:?}", target, pipeline);
        pipeline.connect(target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    /// Writes a marker byte after the stream behind it is opened.
    struct Marker(u8);

    #[async_trait]
    impl Stage for Marker {
        async fn connect(&self, target: &Address, next: Next<'_>) -> Result<TcpStream> {
            let mut stream = next.connect(target).await?;
            stream.write_all(&[self.0]).await?;
            Ok(stream)
        }
    }

    struct CountingHandler(AtomicUsize);

    impl PipelineHandler for CountingHandler {
        fn on_pipeline(&self, pipeline: &mut Pipeline) -> Result<()> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            pipeline.add_first("marker", Marker(n as u8))
        }
    }

    #[test]
    fn test_stage_order_and_names() {
        let mut pipeline = Pipeline::new();
        assert!(pipeline.is_empty());

        pipeline.add_last("b", Marker(2)).unwrap();
        pipeline.add_first("a", Marker(1)).unwrap();
        pipeline.add_last("c", Marker(3)).unwrap();
        assert_eq!(pipeline.names(), vec!["a", "b", "c"]);
        assert_eq!(pipeline.len(), 3);
        assert!(pipeline.get("b").is_some());
        assert!(pipeline.get("d").is_none());

        assert!(pipeline.remove("b").is_some());
        assert!(pipeline.remove("b").is_none());
        assert_eq!(pipeline.names(), vec!["a", "c"]);
    }

    #[test]
    fn test_duplicate_stage() {
        let mut pipeline = Pipeline::new();
        pipeline.add_first("a", Marker(1)).unwrap();
        let err = pipeline.add_first("a", Marker(2)).unwrap_err();
        assert!(matches!(err, Error::DuplicateStage(name) if name == "a"));
        assert_eq!(pipeline.len(), 1);
    }

    #[tokio::test]
    async fn test_stages_run_head_first() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: Address = listener.local_addr().unwrap().into();

        let mut pipeline = Pipeline::new();
        pipeline.add_first("inner", Marker(2)).unwrap();
        pipeline.add_first("outer", Marker(1)).unwrap();

        let _stream = pipeline.connect(&addr).await.unwrap();
        let (mut accepted, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 2];
        accepted.read_exact(&mut buf).await.unwrap();
        // the innermost stage finishes first
        assert_eq!(buf, [2, 1]);
    }

    #[test]
    fn test_connector_builds_fresh_pipelines() {
        let handler = Arc::new(CountingHandler(AtomicUsize::new(0)));
        let connector = Connector::new().with_handler(handler.clone());

        let first = connector.pipeline().unwrap();
        let second = connector.pipeline().unwrap();
        assert_eq!(first.names(), vec!["marker"]);
        assert_eq!(second.names(), vec!["marker"]);
        assert_eq!(handler.0.load(Ordering::SeqCst), 2);
    }
}
