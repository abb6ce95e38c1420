//! Async I/O support for OxiArc compression/decompression.
//!
//! This module provides async versions of the compression and decompression traits,
//! allowing non-blocking I/O operations for use with async runtimes like Tokio.
//!
//! # Example
//!
//! ```rust,ignore
//! use oxiarc_core::async_io::{AsyncCompressor, AsyncDecompressor};
//! use tokio::io::{AsyncRead, AsyncWrite};
//!
//! async fn compress_data<C, R, W>(
//!     compressor: &mut C,
//!     input: &mut R,
//!     output: &mut W,
//! ) -> oxiarc_core::Result<usize>
//! where
//!     C: AsyncCompressor,
//!     R: AsyncRead + Unpin,
//!     W: AsyncWrite + Unpin,
//! {
//!     compressor.compress_async(input, output).await
//! }
//! ```
//!
//! # Feature Flag
//!
//! This module is only available when the `async-io` feature is enabled:
//!
//! ```toml
//! [dependencies]
//! oxiarc-core = { version = "0.2.0", features = ["async-io"] }
//! ```

use crate::error::{OxiArcError, Result};
use crate::traits::{CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode};
use std::future::Future;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default buffer size for async operations (32KB).
const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// A trait for async compression operations.
///
/// This trait provides an asynchronous interface for compressing data from
/// an `AsyncRead` source to an `AsyncWrite` destination.
pub trait AsyncCompressor: Send {
    /// Compress data asynchronously from input to output.
    ///
    /// # Arguments
    ///
    /// * `input` - Async reader providing uncompressed data
    /// * `output` - Async writer to receive compressed data
    ///
    /// # Returns
    ///
    /// The total number of bytes written to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if I/O operations fail or compression encounters invalid data.
    fn compress_async<'a, R, W>(
        &'a mut self,
        input: &'a mut R,
        output: &'a mut W,
    ) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'a>>
    where
        R: AsyncRead + Unpin + Send + 'a,
        W: AsyncWrite + Unpin + Send + 'a;

    /// Compress data with a custom buffer size.
    ///
    /// # Arguments
    ///
    /// * `input` - Async reader providing uncompressed data
    /// * `output` - Async writer to receive compressed data
    /// * `buffer_size` - Size of the internal buffer
    ///
    /// # Returns
    ///
    /// The total number of bytes written to the output.
    fn compress_async_with_buffer<'a, R, W>(
        &'a mut self,
        input: &'a mut R,
        output: &'a mut W,
        buffer_size: usize,
    ) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'a>>
    where
        R: AsyncRead + Unpin + Send + 'a,
        W: AsyncWrite + Unpin + Send + 'a;
}

/// A trait for async decompression operations.
///
/// This trait provides an asynchronous interface for decompressing data from
/// an `AsyncRead` source to an `AsyncWrite` destination.
pub trait AsyncDecompressor: Send {
    /// Decompress data asynchronously from input to output.
    ///
    /// # Arguments
    ///
    /// * `input` - Async reader providing compressed data
    /// * `output` - Async writer to receive decompressed data
    ///
    /// # Returns
    ///
    /// The total number of bytes written to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if I/O operations fail or decompression encounters invalid data.
    fn decompress_async<'a, R, W>(
        &'a mut self,
        input: &'a mut R,
        output: &'a mut W,
    ) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'a>>
    where
        R: AsyncRead + Unpin + Send + 'a,
        W: AsyncWrite + Unpin + Send + 'a;

    /// Decompress data with a custom buffer size.
    ///
    /// # Arguments
    ///
    /// * `input` - Async reader providing compressed data
    /// * `output` - Async writer to receive decompressed data
    /// * `buffer_size` - Size of the internal buffer
    ///
    /// # Returns
    ///
    /// The total number of bytes written to the output.
    fn decompress_async_with_buffer<'a, R, W>(
        &'a mut self,
        input: &'a mut R,
        output: &'a mut W,
        buffer_size: usize,
    ) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'a>>
    where
        R: AsyncRead + Unpin + Send + 'a,
        W: AsyncWrite + Unpin + Send + 'a;
}

/// An async wrapper around a synchronous compressor.
///
/// This wrapper adapts any type implementing the [`Compressor`] trait to work
/// with async I/O using Tokio's async read/write traits.
///
/// # Example
///
/// ```rust,ignore
/// use oxiarc_core::async_io::AsyncCompressorWrapper;
/// use oxiarc_deflate::DeflateCompressor;
///
/// let compressor = DeflateCompressor::new();
/// let mut async_compressor = AsyncCompressorWrapper::new(compressor);
/// ```
pub struct AsyncCompressorWrapper<C> {
    inner: C,
    input_buffer: Vec<u8>,
    output_buffer: Vec<u8>,
}

impl<C: Compressor + Send> AsyncCompressorWrapper<C> {
    /// Create a new async compressor wrapper with default buffer size.
    pub fn new(compressor: C) -> Self {
        Self::with_buffer_size(compressor, DEFAULT_BUFFER_SIZE)
    }

    /// Create a new async compressor wrapper with a custom buffer size.
    pub fn with_buffer_size(compressor: C, buffer_size: usize) -> Self {
        Self {
            inner: compressor,
            input_buffer: vec![0u8; buffer_size],
            output_buffer: vec![0u8; buffer_size],
        }
    }

    /// Get a reference to the inner compressor.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Get a mutable reference to the inner compressor.
    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    /// Consume the wrapper and return the inner compressor.
    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Reset the compressor to its initial state.
    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

impl<C: Compressor + Send> AsyncCompressor for AsyncCompressorWrapper<C> {
    fn compress_async<'a, R, W>(
        &'a mut self,
        input: &'a mut R,
        output: &'a mut W,
    ) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'a>>
    where
        R: AsyncRead + Unpin + Send + 'a,
        W: AsyncWrite + Unpin + Send + 'a,
    {
        self.compress_async_with_buffer(input, output, DEFAULT_BUFFER_SIZE)
    }

    fn compress_async_with_buffer<'a, R, W>(
        &'a mut self,
        input: &'a mut R,
        output: &'a mut W,
        buffer_size: usize,
    ) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'a>>
    where
        R: AsyncRead + Unpin + Send + 'a,
        W: AsyncWrite + Unpin + Send + 'a,
    {
        Box::pin(async move {
            // Resize buffers if needed
            if self.input_buffer.len() < buffer_size {
                self.input_buffer.resize(buffer_size, 0);
            }
            if self.output_buffer.len() < buffer_size {
                self.output_buffer.resize(buffer_size, 0);
            }

            let mut total_written = 0usize;
            let mut input_data = Vec::new();
            let mut input_pos = 0;
            let mut eof_reached = false;

            loop {
                // Read more input if we need it and haven't reached EOF
                if input_pos >= input_data.len() && !eof_reached {
                    let bytes_read = input.read(&mut self.input_buffer).await?;
                    if bytes_read == 0 {
                        eof_reached = true;
                    } else {
                        input_data.extend_from_slice(&self.input_buffer[..bytes_read]);
                    }
                }

                let flush = if eof_reached && input_pos >= input_data.len() {
                    FlushMode::Finish
                } else {
                    FlushMode::None
                };

                let available_input = if input_pos < input_data.len() {
                    &input_data[input_pos..]
                } else {
                    &[]
                };

                let (consumed, produced, status) =
                    self.inner
                        .compress(available_input, &mut self.output_buffer, flush)?;

                input_pos += consumed;

                if produced > 0 {
                    output.write_all(&self.output_buffer[..produced]).await?;
                    total_written += produced;
                }

                match status {
                    CompressStatus::Done => {
                        output.flush().await?;
                        return Ok(total_written);
                    }
                    CompressStatus::NeedsInput if eof_reached && input_pos >= input_data.len() => {
                        // Final flush
                        loop {
                            let (_, produced, status) = self.inner.compress(
                                &[],
                                &mut self.output_buffer,
                                FlushMode::Finish,
                            )?;
                            if produced > 0 {
                                output.write_all(&self.output_buffer[..produced]).await?;
                                total_written += produced;
                            }
                            if status == CompressStatus::Done {
                                output.flush().await?;
                                return Ok(total_written);
                            }
                        }
                    }
                    CompressStatus::NeedsInput | CompressStatus::NeedsOutput => {
                        // Continue processing
                    }
                }
            }
        })
    }
}

/// An async wrapper around a synchronous decompressor.
///
/// This wrapper adapts any type implementing the [`Decompressor`] trait to work
/// with async I/O using Tokio's async read/write traits.
///
/// # Example
///
/// ```rust,ignore
/// use oxiarc_core::async_io::AsyncDecompressorWrapper;
/// use oxiarc_deflate::DeflateDecompressor;
///
/// let decompressor = DeflateDecompressor::new();
/// let mut async_decompressor = AsyncDecompressorWrapper::new(decompressor);
/// ```
pub struct AsyncDecompressorWrapper<D> {
    inner: D,
    input_buffer: Vec<u8>,
    output_buffer: Vec<u8>,
}

impl<D: Decompressor + Send> AsyncDecompressorWrapper<D> {
    /// Create a new async decompressor wrapper with default buffer size.
    pub fn new(decompressor: D) -> Self {
        Self::with_buffer_size(decompressor, DEFAULT_BUFFER_SIZE)
    }

    /// Create a new async decompressor wrapper with a custom buffer size.
    pub fn with_buffer_size(decompressor: D, buffer_size: usize) -> Self {
        Self {
            inner: decompressor,
            input_buffer: vec![0u8; buffer_size],
            output_buffer: vec![0u8; buffer_size],
        }
    }

    /// Get a reference to the inner decompressor.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Get a mutable reference to the inner decompressor.
    pub fn inner_mut(&mut self) -> &mut D {
        &mut self.inner
    }

    /// Consume the wrapper and return the inner decompressor.
    pub fn into_inner(self) -> D {
        self.inner
    }

    /// Reset the decompressor to its initial state.
    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

impl<D: Decompressor + Send> AsyncDecompressor for AsyncDecompressorWrapper<D> {
    fn decompress_async<'a, R, W>(
        &'a mut self,
        input: &'a mut R,
        output: &'a mut W,
    ) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'a>>
    where
        R: AsyncRead + Unpin + Send + 'a,
        W: AsyncWrite + Unpin + Send + 'a,
    {
        self.decompress_async_with_buffer(input, output, DEFAULT_BUFFER_SIZE)
    }

    fn decompress_async_with_buffer<'a, R, W>(
        &'a mut self,
        input: &'a mut R,
        output: &'a mut W,
        buffer_size: usize,
    ) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'a>>
    where
        R: AsyncRead + Unpin + Send + 'a,
        W: AsyncWrite + Unpin + Send + 'a,
    {
        Box::pin(async move {
            // Resize buffers if needed
            if self.input_buffer.len() < buffer_size {
                self.input_buffer.resize(buffer_size, 0);
            }
            if self.output_buffer.len() < buffer_size {
                self.output_buffer.resize(buffer_size, 0);
            }

            let mut total_written = 0usize;
            let mut input_data = Vec::new();
            let mut input_pos = 0;
            let mut eof_reached = false;

            loop {
                // Read more input if we need it and haven't reached EOF
                if input_pos >= input_data.len() && !eof_reached {
                    let bytes_read = input.read(&mut self.input_buffer).await?;
                    if bytes_read == 0 {
                        eof_reached = true;
                    } else {
                        input_data.extend_from_slice(&self.input_buffer[..bytes_read]);
                    }
                }

                let available_input = if input_pos < input_data.len() {
                    &input_data[input_pos..]
                } else {
                    &[]
                };

                let (consumed, produced, status) = self
                    .inner
                    .decompress(available_input, &mut self.output_buffer)?;

                input_pos += consumed;

                if produced > 0 {
                    output.write_all(&self.output_buffer[..produced]).await?;
                    total_written += produced;
                }

                match status {
                    DecompressStatus::Done => {
                        output.flush().await?;
                        return Ok(total_written);
                    }
                    DecompressStatus::NeedsInput
                        if eof_reached && input_pos >= input_data.len() =>
                    {
                        // No more input available
                        if self.inner.is_finished() {
                            output.flush().await?;
                            return Ok(total_written);
                        }
                        return Err(OxiArcError::unexpected_eof(1));
                    }
                    DecompressStatus::NeedsInput
                    | DecompressStatus::NeedsOutput
                    | DecompressStatus::BlockEnd => {
                        // Continue processing
                    }
                }
            }
        })
    }
}

/// A channel-based async compressor for streaming compression.
///
/// This allows feeding data through a channel for streaming compression
/// scenarios where the input arrives asynchronously.
pub struct StreamingAsyncCompressor<C> {
    wrapper: AsyncCompressorWrapper<C>,
}

impl<C: Compressor + Send> StreamingAsyncCompressor<C> {
    /// Create a new streaming async compressor.
    pub fn new(compressor: C) -> Self {
        Self {
            wrapper: AsyncCompressorWrapper::new(compressor),
        }
    }

    /// Create a new streaming async compressor with a custom buffer size.
    pub fn with_buffer_size(compressor: C, buffer_size: usize) -> Self {
        Self {
            wrapper: AsyncCompressorWrapper::with_buffer_size(compressor, buffer_size),
        }
    }

    /// Compress a chunk of data.
    ///
    /// # Arguments
    ///
    /// * `data` - Data to compress
    /// * `is_final` - Whether this is the last chunk
    ///
    /// # Returns
    ///
    /// Compressed data bytes.
    pub fn compress_chunk(&mut self, data: &[u8], is_final: bool) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut pos = 0;
        let mut buffer = vec![0u8; DEFAULT_BUFFER_SIZE];

        loop {
            let flush = if is_final && pos >= data.len() {
                FlushMode::Finish
            } else {
                FlushMode::None
            };

            let input_slice = if pos < data.len() { &data[pos..] } else { &[] };

            let (consumed, produced, status) =
                self.wrapper
                    .inner
                    .compress(input_slice, &mut buffer, flush)?;

            pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            match status {
                CompressStatus::Done => return Ok(output),
                CompressStatus::NeedsInput if pos >= data.len() && is_final => loop {
                    let (_, produced, status) =
                        self.wrapper
                            .inner
                            .compress(&[], &mut buffer, FlushMode::Finish)?;
                    output.extend_from_slice(&buffer[..produced]);
                    if status == CompressStatus::Done {
                        return Ok(output);
                    }
                },
                CompressStatus::NeedsInput if pos >= data.len() => return Ok(output),
                _ => continue,
            }
        }
    }

    /// Reset the compressor for reuse.
    pub fn reset(&mut self) {
        self.wrapper.reset();
    }
}

/// A channel-based async decompressor for streaming decompression.
///
/// This allows feeding data through a channel for streaming decompression
/// scenarios where the input arrives asynchronously.
pub struct StreamingAsyncDecompressor<D> {
    wrapper: AsyncDecompressorWrapper<D>,
    pending_input: Vec<u8>,
}

impl<D: Decompressor + Send> StreamingAsyncDecompressor<D> {
    /// Create a new streaming async decompressor.
    pub fn new(decompressor: D) -> Self {
        Self {
            wrapper: AsyncDecompressorWrapper::new(decompressor),
            pending_input: Vec::new(),
        }
    }

    /// Create a new streaming async decompressor with a custom buffer size.
    pub fn with_buffer_size(decompressor: D, buffer_size: usize) -> Self {
        Self {
            wrapper: AsyncDecompressorWrapper::with_buffer_size(decompressor, buffer_size),
            pending_input: Vec::new(),
        }
    }

    /// Decompress a chunk of data.
    ///
    /// # Arguments
    ///
    /// * `data` - Compressed data chunk
    ///
    /// # Returns
    ///
    /// Decompressed data bytes, or empty if more input is needed.
    pub fn decompress_chunk(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.pending_input.extend_from_slice(data);

        let mut output = Vec::new();
        let mut buffer = vec![0u8; DEFAULT_BUFFER_SIZE];
        let mut pos = 0;

        loop {
            if pos >= self.pending_input.len() {
                break;
            }

            let (consumed, produced, status) = self
                .wrapper
                .inner
                .decompress(&self.pending_input[pos..], &mut buffer)?;

            pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            match status {
                DecompressStatus::Done => {
                    // Remove consumed data
                    self.pending_input.drain(..pos);
                    return Ok(output);
                }
                DecompressStatus::NeedsInput => {
                    // Need more input, keep pending data
                    self.pending_input.drain(..pos);
                    return Ok(output);
                }
                DecompressStatus::NeedsOutput | DecompressStatus::BlockEnd => {
                    // Continue processing
                }
            }
        }

        self.pending_input.drain(..pos);
        Ok(output)
    }

    /// Check if the decompressor has finished.
    pub fn is_finished(&self) -> bool {
        self.wrapper.inner.is_finished()
    }

    /// Reset the decompressor for reuse.
    pub fn reset(&mut self) {
        self.wrapper.reset();
        self.pending_input.clear();
    }
}

/// Compress data concurrently from multiple sources.
///
/// This function takes multiple async readers and compresses them concurrently,
/// writing the results to corresponding async writers.
///
/// # Arguments
///
/// * `operations` - A vector of tuples containing (compressor, input, output)
///
/// # Returns
///
/// A vector of results, one for each operation.
pub async fn compress_concurrent<C, R, W>(
    operations: Vec<(AsyncCompressorWrapper<C>, R, W)>,
) -> Vec<Result<usize>>
where
    C: Compressor + Send + 'static,
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    use tokio::task::JoinSet;

    let mut join_set = JoinSet::new();

    for (mut compressor, mut input, mut output) in operations {
        join_set.spawn(async move { compressor.compress_async(&mut input, &mut output).await });
    }

    let mut results = Vec::new();
    while let Some(result) = join_set.join_next().await {
        match result {
            Ok(inner_result) => results.push(inner_result),
            Err(e) => results.push(Err(OxiArcError::Io(std::io::Error::other(e.to_string())))),
        }
    }

    results
}

/// Decompress data concurrently from multiple sources.
///
/// This function takes multiple async readers and decompresses them concurrently,
/// writing the results to corresponding async writers.
///
/// # Arguments
///
/// * `operations` - A vector of tuples containing (decompressor, input, output)
///
/// # Returns
///
/// A vector of results, one for each operation.
pub async fn decompress_concurrent<D, R, W>(
    operations: Vec<(AsyncDecompressorWrapper<D>, R, W)>,
) -> Vec<Result<usize>>
where
    D: Decompressor + Send + 'static,
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    use tokio::task::JoinSet;

    let mut join_set = JoinSet::new();

    for (mut decompressor, mut input, mut output) in operations {
        join_set.spawn(async move { decompressor.decompress_async(&mut input, &mut output).await });
    }

    let mut results = Vec::new();
    while let Some(result) = join_set.join_next().await {
        match result {
            Ok(inner_result) => results.push(inner_result),
            Err(e) => results.push(Err(OxiArcError::Io(std::io::Error::other(e.to_string())))),
        }
    }

    results
}
