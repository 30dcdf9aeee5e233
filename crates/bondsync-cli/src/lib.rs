// Copyright 2025 bondsync Authors
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

//! # bondsync CLI
//!
//! Thin launcher for the bondsync live document server.
//!
//! ## Key Commands
//!
//! - `bondsync serve`: Run documents in an external engine and serve bond
//!   updates for them
//! - `bondsync hash`: Print the hash a document is addressed by in URLs and
//!   cache file names

pub mod launcher;
