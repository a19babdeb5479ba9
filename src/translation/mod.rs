/*!
 * Batch translation against the remote batch API.
 *
 * This module contains the request/response side of a batch job. It keeps no
 * state between calls. It is split into several submodules:
 *
 * - `request`: JSONL request file construction and `request-{index}` tags
 * - `poller`: Fixed-interval polling to a terminal status
 * - `results`: Result stream parsing and reassembly by input position
 * - `batch`: The `BatchClient` driving a whole job lifecycle
 */

// Re-export main types for easier usage
pub use self::batch::{BatchClient, BatchOutcome, JobHooks, NoHooks, ResumedJob};
pub use self::poller::{JobPoller, PollSettings};
pub use self::request::RequestTemplate;

// Submodules
pub mod batch;
pub mod poller;
pub mod request;
pub mod results;
