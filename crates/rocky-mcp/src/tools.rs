//! MCP tool definitions and request handling
//!
//! This module defines all available tools and handles MCP protocol messages.

use chrono::Utc;
use rocky_core::{Agent, GroupBy, Portfolio, PositionFilter, Session};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::error::{validate_limit, validate_message, validate_usd_range, RockyMcpError};
use crate::yields::YieldsClient;

const DEFAULT_HISTORY_LIMIT: u64 = 20;

// =============================================================================
// MCP Protocol Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

// =============================================================================
// Rocky Tools
// =============================================================================

/// Tool handler owning the single conversation session
pub struct RockyTools {
    agent: Agent<YieldsClient>,
    session: Mutex<Session>,
    portfolio: Portfolio,
}

impl RockyTools {
    pub fn new(agent: Agent<YieldsClient>, portfolio: Portfolio) -> Self {
        Self {
            agent,
            session: Mutex::new(Session::new()),
            portfolio,
        }
    }

    /// Get all available tools
    pub fn get_tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: "rocky_health".to_string(),
                description: "Check the health of the Rocky service, its yields API endpoint and cooldown cache".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            },
            Tool {
                name: "rocky_chat".to_string(),
                description: "Send one message to the DeFi yield assistant. Understands Spanish and English criteria such as 'Token ETH en Arbitrum con TVL minimo 1M', 'apy mayor a 5%', 'mas info de la posicion 2', 'grafico' or 'reset'. Returns the reply with a results table, a detail record or chart series.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "message": {
                            "type": "string",
                            "description": "Free-form user message (max 500 characters)"
                        }
                    },
                    "required": ["message"]
                }),
            },
            Tool {
                name: "rocky_get_filters".to_string(),
                description: "Get the current search criteria and the cached top opportunities.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            },
            Tool {
                name: "rocky_reset".to_string(),
                description: "Clear every search criterion and the cached opportunities.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {},
                    "required": []
                }),
            },
            Tool {
                name: "rocky_get_history".to_string(),
                description: "Get the most recent conversation turns, oldest first.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "limit": {
                            "type": "integer",
                            "description": "Number of turns to return (1-200, default: 20)"
                        }
                    },
                    "required": []
                }),
            },
            Tool {
                name: "rocky_portfolio_summary".to_string(),
                description: "Summarize the tracked portfolio: total value, simple statistics and value distribution per dimension.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "group_by": {
                            "type": "string",
                            "enum": ["wallet", "chain", "protocol", "category"],
                            "description": "Single dimension to group by (default: all of them)"
                        }
                    },
                    "required": []
                }),
            },
            Tool {
                name: "rocky_portfolio_positions".to_string(),
                description: "List portfolio positions filtered by wallet, chain, token category and USD value range. Shares are relative to the selection.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "wallet": { "type": "string", "description": "Wallet label, e.g. 'Wallet #1'" },
                        "chain": { "type": "string", "description": "Chain name" },
                        "category": {
                            "type": "string",
                            "enum": ["Stablecoin", "Bluechip", "Altcoin"],
                            "description": "Token category"
                        },
                        "min_usd": { "type": "number", "description": "Minimum position value in USD" },
                        "max_usd": { "type": "number", "description": "Maximum position value in USD" }
                    },
                    "required": []
                }),
            },
        ]
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: &Value) -> Result<Value, String> {
        match name {
            "rocky_health" => {
                let yields = self.agent.source();
                let session = self.session.lock().await;

                Ok(json!({
                    "status": "healthy",
                    "version": env!("CARGO_PKG_VERSION"),
                    "timestamp": Utc::now().to_rfc3339(),
                    "yields_api": yields.api_url(),
                    "cache": yields.cache().stats(),
                    "session": {
                        "phase": session.phase(),
                        "turns": session.history().len()
                    }
                }))
            }

            "rocky_chat" => {
                let message = args["message"].as_str().ok_or("Missing message parameter")?;
                validate_message(message).map_err(|e| e.to_string())?;

                let mut session = self.session.lock().await;
                let response = self.agent.handle_turn(&mut session, message).await;

                Ok(json!({
                    "response": response,
                    "filters": session.filters(),
                    "phase": session.phase()
                }))
            }

            "rocky_get_filters" => {
                let session = self.session.lock().await;
                Ok(json!({
                    "filters": session.filters(),
                    "phase": session.phase(),
                    "opportunities": session.last_opportunities().rows()
                }))
            }

            "rocky_reset" => {
                let mut session = self.session.lock().await;
                session.reset();
                tracing::info!("Session criteria reset");
                Ok(json!({
                    "status": "reset",
                    "filters": session.filters()
                }))
            }

            "rocky_get_history" => {
                let limit = args["limit"].as_u64().unwrap_or(DEFAULT_HISTORY_LIMIT);
                validate_limit(limit).map_err(|e| e.to_string())?;

                let session = self.session.lock().await;
                let turns = session.recent_history(limit as usize);
                Ok(json!({
                    "total": session.history().len(),
                    "turns": turns
                }))
            }

            "rocky_portfolio_summary" => {
                let dimensions = match args["group_by"].as_str() {
                    Some(raw) => vec![raw.parse::<GroupBy>().map_err(|e| RockyMcpError::from(e).to_string())?],
                    None => vec![GroupBy::Wallet, GroupBy::Chain, GroupBy::Protocol, GroupBy::Category],
                };

                let mut groups = serde_json::Map::new();
                for dimension in dimensions {
                    let key = serde_json::to_value(dimension).map_err(|e| e.to_string())?;
                    let key = key.as_str().unwrap_or_default().to_string();
                    groups.insert(key, json!(self.portfolio.group_by(dimension)));
                }

                Ok(json!({
                    "total_value": self.portfolio.total_value(),
                    "stats": self.portfolio.stats(),
                    "groups": groups
                }))
            }

            "rocky_portfolio_positions" => {
                let filter: PositionFilter = if args.is_null() {
                    PositionFilter::default()
                } else {
                    serde_json::from_value(args.clone())
                        .map_err(|e| RockyMcpError::from(e).to_string())?
                };
                validate_usd_range(filter.min_usd, filter.max_usd).map_err(|e| e.to_string())?;

                let positions = self.portfolio.filter_positions(&filter);
                let total: f64 = positions.iter().map(|p| p.holding.usd).sum();
                Ok(json!({
                    "count": positions.len(),
                    "total_usd": total,
                    "positions": positions
                }))
            }

            _ => Err(format!("Unknown tool: {}", name)),
        }
    }
}

// =============================================================================
// MCP Protocol Handlers
// =============================================================================

fn handle_initialize(_params: &Value) -> Value {
    json!({
        "protocolVersion": "2024-11-05",
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": "rocky-mcp",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn handle_list_tools(tools: &RockyTools) -> Value {
    json!({
        "tools": tools.get_tools()
    })
}

async fn handle_call_tool(tools: &RockyTools, params: &Value) -> Value {
    let name = params["name"].as_str().unwrap_or("");
    let args = &params["arguments"];

    match tools.execute(name, args).await {
        Ok(result) => {
            json!({
                "content": [{
                    "type": "text",
                    "text": serde_json::to_string_pretty(&result).unwrap_or_default()
                }]
            })
        }
        Err(e) => {
            tracing::warn!(tool = %name, error = %e, "Tool call failed");
            json!({
                "content": [{
                    "type": "text",
                    "text": format!("Error: {}", e)
                }],
                "isError": true
            })
        }
    }
}

/// Handle an incoming MCP request
pub async fn handle_request(
    tools: &RockyTools,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    let result = match request.method.as_str() {
        "initialize" => Some(handle_initialize(&request.params)),
        "initialized" | "notifications/initialized" => None,
        "tools/list" => Some(handle_list_tools(tools)),
        "tools/call" => Some(handle_call_tool(tools, &request.params).await),
        "notifications/cancelled" => None,
        _ => {
            return Some(JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: request.id,
                result: None,
                error: Some(JsonRpcError {
                    code: -32601,
                    message: format!("Method not found: {}", request.method),
                }),
            });
        }
    };

    result.map(|r| JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id: request.id,
        result: Some(r),
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::{CacheConfig, YieldsConfig};
    use rocky_core::AgentSettings;

    fn offline_tools() -> RockyTools {
        let config = YieldsConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 2,
        };
        let client = YieldsClient::new(&config, create_cache(&CacheConfig::default())).unwrap();
        RockyTools::new(Agent::new(client, AgentSettings::default()), Portfolio::sample())
    }

    fn request(method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: json!(1),
            method: method.to_string(),
            params,
        }
    }

    #[test]
    fn test_tool_names() {
        let names: Vec<_> = offline_tools().get_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "rocky_health",
                "rocky_chat",
                "rocky_get_filters",
                "rocky_reset",
                "rocky_get_history",
                "rocky_portfolio_summary",
                "rocky_portfolio_positions",
            ]
        );
    }

    #[tokio::test]
    async fn test_chat_requires_message() {
        let tools = offline_tools();
        assert!(tools.execute("rocky_chat", &json!({})).await.is_err());
        assert!(tools.execute("rocky_chat", &json!({"message": " "})).await.is_err());
    }

    #[tokio::test]
    async fn test_chat_reset_and_history() {
        let tools = offline_tools();

        let reply = tools.execute("rocky_chat", &json!({"message": "reset"})).await.unwrap();
        assert_eq!(reply["response"]["kind"], json!("none"));
        assert_eq!(reply["phase"], json!("idle"));

        let history = tools.execute("rocky_get_history", &json!({"limit": 1})).await.unwrap();
        assert_eq!(history["total"], json!(2));
        assert_eq!(history["turns"][0]["role"], json!("assistant"));
    }

    #[tokio::test]
    async fn test_chat_detail_before_search() {
        let tools = offline_tools();
        let reply = tools
            .execute("rocky_chat", &json!({"message": "mas info de la posicion 2"}))
            .await
            .unwrap();
        assert_eq!(reply["response"]["kind"], json!("error"));
    }

    #[tokio::test]
    async fn test_reset_tool_clears_filters() {
        let tools = offline_tools();
        let reply = tools.execute("rocky_reset", &Value::Null).await.unwrap();
        assert_eq!(reply["status"], json!("reset"));
        assert_eq!(reply["filters"]["blockchain"], Value::Null);
    }

    #[tokio::test]
    async fn test_portfolio_summary() {
        let tools = offline_tools();

        let all = tools.execute("rocky_portfolio_summary", &json!({})).await.unwrap();
        assert_eq!(all["stats"]["count"], json!(5));
        assert!(all["groups"]["category"].is_array());

        let chain = tools
            .execute("rocky_portfolio_summary", &json!({"group_by": "cadena"}))
            .await
            .unwrap();
        assert_eq!(chain["groups"]["chain"][0]["key"], json!("base"));
        assert!(chain["groups"].get("wallet").is_none());

        assert!(tools
            .execute("rocky_portfolio_summary", &json!({"group_by": "color"}))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_portfolio_positions() {
        let tools = offline_tools();

        let bluechips = tools
            .execute("rocky_portfolio_positions", &json!({"category": "Bluechip"}))
            .await
            .unwrap();
        assert_eq!(bluechips["count"], json!(3));

        let bad_range = tools
            .execute("rocky_portfolio_positions", &json!({"min_usd": 10.0, "max_usd": 1.0}))
            .await;
        assert!(bad_range.is_err());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = offline_tools().execute("rocky_nope", &json!({})).await.unwrap_err();
        assert_eq!(err, "Unknown tool: rocky_nope");
    }

    #[tokio::test]
    async fn test_handle_request_routing() {
        let tools = offline_tools();

        let init = handle_request(&tools, request("initialize", json!({}))).await.unwrap();
        assert_eq!(init.result.unwrap()["serverInfo"]["name"], json!("rocky-mcp"));

        assert!(handle_request(&tools, request("initialized", Value::Null)).await.is_none());

        let missing = handle_request(&tools, request("resources/list", Value::Null)).await.unwrap();
        assert_eq!(missing.error.unwrap().code, -32601);

        let call = handle_request(
            &tools,
            request("tools/call", json!({"name": "rocky_nope", "arguments": {}})),
        )
        .await
        .unwrap();
        assert_eq!(call.result.unwrap()["isError"], json!(true));
    }
}
