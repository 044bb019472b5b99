//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! `linewised`, the chat server binary

use clap::Parser;
use linewise_server::{Arguments, ChatHandler, TelnetServer};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let arguments: Arguments = Parser::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_level(true)
        .init();

    let config = arguments.into_config();
    if let Err(err) = config.validate() {
        tracing::error!(error = %err, "Refusing to start");
        return ExitCode::from(2);
    }

    let handler = ChatHandler::new(config.announce_departures);
    let mut server = match TelnetServer::bind(config, handler).await {
        Ok(server) => server,
        Err(err) => {
            tracing::error!(error = %err, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        result = server.run() => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                tracing::error!(error = %err, "Server stopped");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
            ExitCode::SUCCESS
        }
    }
}
