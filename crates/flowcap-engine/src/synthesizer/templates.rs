use crate::classifier::TemplateKind;

/// Parameter names used by a connector operation.
#[derive(Debug)]
pub struct ParameterKeys {
    pub method: &'static str,
    pub uri: &'static str,
    pub headers: &'static str,
    pub body: &'static str,
}

/// Static connector metadata of one definition family.
#[derive(Debug)]
pub struct Family {
    pub kind: TemplateKind,
    pub id: &'static str,
    pub brand_color: &'static str,
    pub icon: &'static str,
    pub display_name: &'static str,
    pub connection_name: &'static str,
    pub connection_id: &'static str,
    pub api_id: &'static str,
    pub operation_id: &'static str,
    pub parameter_keys: ParameterKeys,
}

const PASCAL_KEYS: ParameterKeys = ParameterKeys {
    method: "parameters/Method",
    uri: "parameters/Uri",
    headers: "parameters/Headers",
    body: "parameters/Body",
};

pub static FAMILIES: [Family; 5] = [
    Family {
        kind: TemplateKind::StorageDocument,
        id: "2b4f6d1e-7c1a-4c55-9d6e-5f1b3a0c8e01",
        brand_color: "#036C70",
        icon: "https://connectoricons-prod.azureedge.net/releases/v1.0.1676/1.0.1676.3617/sharepointonline/icon.png",
        display_name: "SharePoint",
        connection_name: "shared_sharepointonline",
        connection_id: "/providers/Microsoft.PowerApps/apis/shared_sharepointonline/connections/shared-sharepointonl",
        api_id: "/providers/Microsoft.PowerApps/apis/shared_sharepointonline",
        operation_id: "HttpRequest",
        parameter_keys: ParameterKeys {
            method: "parameters/method",
            uri: "parameters/uri",
            headers: "parameters/headers",
            body: "parameters/body",
        },
    },
    Family {
        kind: TemplateKind::GenericHttp,
        id: "8e0d3c5a-1f7b-4e2a-b6c4-9a2d7e5f1c02",
        brand_color: "#709727",
        icon: "https://connectoricons-prod.azureedge.net/releases/v1.0.1676/1.0.1676.3617/http/icon.png",
        display_name: "HTTP",
        connection_name: "",
        connection_id: "",
        api_id: "",
        operation_id: "",
        parameter_keys: ParameterKeys {
            method: "method",
            uri: "uri",
            headers: "headers",
            body: "body",
        },
    },
    Family {
        kind: TemplateKind::Groups,
        id: "5a9c1e7d-3b2f-4d8a-a1e6-0c4b8f2d6e03",
        brand_color: "#D83B01",
        icon: "https://connectoricons-prod.azureedge.net/releases/v1.0.1676/1.0.1676.3617/office365groups/icon.png",
        display_name: "Office 365 Groups",
        connection_name: "shared_office365groups",
        connection_id: "/providers/Microsoft.PowerApps/apis/shared_office365groups/connections/shared-office365group",
        api_id: "/providers/Microsoft.PowerApps/apis/shared_office365groups",
        operation_id: "HttpRequestV2",
        parameter_keys: ParameterKeys {
            method: "parameters/method",
            uri: "parameters/uri",
            headers: "parameters/headers",
            body: "parameters/body",
        },
    },
    Family {
        kind: TemplateKind::Messaging,
        id: "c3e7a9b1-6d4f-4b0c-8e2a-7f5d1b9c3a04",
        brand_color: "#4B53BC",
        icon: "https://connectoricons-prod.azureedge.net/releases/v1.0.1676/1.0.1676.3617/teams/icon.png",
        display_name: "Microsoft Teams",
        connection_name: "shared_teams",
        connection_id: "/providers/Microsoft.PowerApps/apis/shared_teams/connections/shared-teams",
        api_id: "/providers/Microsoft.PowerApps/apis/shared_teams",
        operation_id: "HttpRequest",
        parameter_keys: PASCAL_KEYS,
    },
    Family {
        kind: TemplateKind::MailCalendar,
        id: "f1b5d9e3-2a6c-4f7e-9b3d-4e8a0c6f2b05",
        brand_color: "#0078D4",
        icon: "https://connectoricons-prod.azureedge.net/releases/v1.0.1676/1.0.1676.3617/office365/icon.png",
        display_name: "Office 365 Outlook",
        connection_name: "shared_office365",
        connection_id: "/providers/Microsoft.PowerApps/apis/shared_office365/connections/shared-office365",
        api_id: "/providers/Microsoft.PowerApps/apis/shared_office365",
        operation_id: "HttpRequest",
        parameter_keys: PASCAL_KEYS,
    },
];

pub fn family(kind: TemplateKind) -> &'static Family {
    match kind {
        TemplateKind::StorageDocument => &FAMILIES[0],
        TemplateKind::GenericHttp => &FAMILIES[1],
        TemplateKind::Groups => &FAMILIES[2],
        TemplateKind::Messaging => &FAMILIES[3],
        TemplateKind::MailCalendar => &FAMILIES[4],
    }
}

/// Connector operation (storage-document, groups, messaging, mail-calendar).
/// Slot values are inserted verbatim and must already be JSON text.
pub const CONNECTOR_TEMPLATE: &str = r#"{
  "id": {{id}},
  "brandColor": {{brand_color}},
  "connectionReferences": {
    {{connection_name}}: {
      "connection": {
        "id": {{connection_id}}
      }
    }
  },
  "connectorDisplayName": {{display_name}},
  "icon": {{icon}},
  "isTrigger": false,
  "operationName": {{operation_name}},
  "operationDefinition": {
    "type": "OpenApiConnection",
    "inputs": {
      "host": {
        "connectionName": {{connection_name}},
        "operationId": {{operation_id}},
        "apiId": {{api_id}}
      },
      "parameters": {
{{parameters}}
      },
      "authentication": "@parameters('$authentication')"
    },
    "runAfter": {}
  }
}"#;

/// Built-in HTTP action. `body` is either empty or a complete `,"body": …`
/// line.
pub const HTTP_TEMPLATE: &str = r#"{
  "id": {{id}},
  "brandColor": {{brand_color}},
  "connectionReferences": {},
  "connectorDisplayName": {{display_name}},
  "icon": {{icon}},
  "isTrigger": false,
  "operationName": {{operation_name}},
  "operationDefinition": {
    "type": "Http",
    "inputs": {
      "method": {{method}},
      "uri": {{uri}},
      "headers": {{headers}}{{body}}
    },
    "runAfter": {}
  }
}"#;

/// Single-pass `{{slot}}` substitution. Substituted text is never rescanned;
/// unknown slots render as empty.
pub fn render<S: AsRef<str>>(template: &str, slots: &[(&str, S)]) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = &after[..end];
                if let Some((_, value)) = slots.iter().find(|(slot, _)| *slot == name) {
                    out.push_str(value.as_ref());
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
