// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

pub mod client;
pub mod connection;
pub mod data_provider;
pub mod load_balancer;
pub mod logging;
pub mod record;
pub mod searchable;
