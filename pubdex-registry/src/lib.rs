// Copyright 2025 Pubdex (https://github.com/pubdex)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Upstream pub.dev client with resilience pipeline and memoizing cache.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod wire;

pub use api::{PackageManifest, RegistryApi};
pub use cache::MemoCache;
pub use client::PubDevClient;
pub use config::RegistryConfig;
