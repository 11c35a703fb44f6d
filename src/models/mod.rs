// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

pub mod config;
pub mod criteria;
pub mod document;
pub mod pagination;
pub mod response;
pub mod sort;
