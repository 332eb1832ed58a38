//! Docker Engine runtime backed by bollard

use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, LogOutput, LogsOptions};
use bollard::errors::Error as BollardError;
use bollard::exec::{CreateExecOptions, StartExecOptions, StartExecResults};
use bollard::Docker;
use futures::{future, StreamExt};

use tg_core::error::RuntimeError;
use tg_core::traits::{
    ExecAttachment, ExecId, ExecSpec, LogChunk, LogOptions, LogStream, OutputChannel, Runtime,
};

/// Local Docker daemon
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect using `DOCKER_HOST` or the platform default socket
    pub fn connect() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults().map_err(api_error)?;
        Ok(Self { docker })
    }

    /// Wrap an existing client
    pub fn with_client(docker: Docker) -> Self {
        Self { docker }
    }
}

fn api_error(e: BollardError) -> RuntimeError {
    match e {
        BollardError::DockerResponseServerError {
            status_code: 404,
            message,
        } => RuntimeError::NotFound(message),
        BollardError::DockerResponseServerError { message, .. } => RuntimeError::Api(message),
        other => RuntimeError::Api(other.to_string()),
    }
}

fn stream_error(e: BollardError) -> RuntimeError {
    RuntimeError::Stream(e.to_string())
}

/// Tag a multiplexed log frame; stdin echoes are dropped
fn log_chunk(output: LogOutput) -> Option<LogChunk> {
    match output {
        LogOutput::StdOut { message } => Some(LogChunk::new(OutputChannel::Stdout, message)),
        LogOutput::StdErr { message } => Some(LogChunk::new(OutputChannel::Stderr, message)),
        LogOutput::Console { message } => Some(LogChunk::new(OutputChannel::Console, message)),
        LogOutput::StdIn { .. } => None,
    }
}

#[async_trait]
impl Runtime for DockerRuntime {
    async fn inspect_container(&self, container_id: &str) -> Result<(), RuntimeError> {
        self.docker
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await
            .map(|_| ())
            .map_err(api_error)
    }

    async fn create_exec(
        &self,
        container_id: &str,
        spec: &ExecSpec,
    ) -> Result<ExecId, RuntimeError> {
        let options = CreateExecOptions {
            cmd: Some(spec.argv.clone()),
            attach_stdin: Some(true),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            tty: Some(spec.tty),
            ..Default::default()
        };

        let created = self
            .docker
            .create_exec(container_id, options)
            .await
            .map_err(api_error)?;
        Ok(ExecId(created.id))
    }

    async fn attach_exec(&self, exec: &ExecId, tty: bool) -> Result<ExecAttachment, RuntimeError> {
        let options = StartExecOptions {
            detach: false,
            tty,
            ..Default::default()
        };

        match self
            .docker
            .start_exec(&exec.0, Some(options))
            .await
            .map_err(api_error)?
        {
            StartExecResults::Attached { output, input } => Ok(ExecAttachment {
                output: Box::pin(output.map(|item| {
                    item.map(LogOutput::into_bytes).map_err(stream_error)
                })),
                input,
            }),
            StartExecResults::Detached => {
                Err(RuntimeError::Api(format!("exec {} started detached", exec)))
            }
        }
    }

    async fn exec_running(&self, exec: &ExecId) -> Result<bool, RuntimeError> {
        let inspect = self.docker.inspect_exec(&exec.0).await.map_err(api_error)?;
        Ok(inspect.running.unwrap_or(false))
    }

    async fn logs(
        &self,
        container_id: &str,
        options: &LogOptions,
    ) -> Result<LogStream, RuntimeError> {
        // Log errors only surface once the stream is read
        self.inspect_container(container_id).await?;

        let query = LogsOptions::<String> {
            follow: options.follow,
            stdout: true,
            stderr: true,
            tail: options.tail.to_string(),
            ..Default::default()
        };

        let stream = self
            .docker
            .logs(container_id, Some(query))
            .filter_map(|item| {
                future::ready(match item {
                    Ok(output) => log_chunk(output).map(Ok),
                    Err(e) => Some(Err(stream_error(e))),
                })
            });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_not_found_is_distinguished() {
        let err = api_error(BollardError::DockerResponseServerError {
            status_code: 404,
            message: "No such container: c9".to_string(),
        });
        assert!(matches!(err, RuntimeError::NotFound(ref m) if m == "No such container: c9"));

        let err = api_error(BollardError::DockerResponseServerError {
            status_code: 409,
            message: "container is paused".to_string(),
        });
        assert_eq!(err.to_string(), "container is paused");
    }

    #[test]
    fn test_log_frames_are_tagged() {
        let chunk = log_chunk(LogOutput::StdErr {
            message: Bytes::from_static(b"oops\n"),
        })
        .unwrap();
        assert_eq!(chunk.channel, OutputChannel::Stderr);
        assert_eq!(chunk.data, Bytes::from_static(b"oops\n"));

        assert!(log_chunk(LogOutput::StdIn {
            message: Bytes::from_static(b"typed"),
        })
        .is_none());
    }
}
