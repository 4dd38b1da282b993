// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#[cfg(feature = "yaml")]
mod marking;
