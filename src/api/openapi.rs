//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{
    auth_handler, calendar_handler, chat_handler, code_handler, notification_handler,
    phone_handler, remote_handler, spreadsheet_handler, unit_handler, user_handler,
};
use crate::domain::{
    CalendarEvent, CallStatus, CellUpdate, ChatMessage, CodeDocument, CommunicationLink,
    Conversation, ConversationDetails, Frame, FrameFormat, InputEvent, Language, MouseButton,
    Notification, Permission, PhoneCallResponse, RemoteSession, SessionStatus, Spreadsheet, Unit,
    UnitGrant, UserResponse, UserRole,
};
use crate::services::TokenResponse;
use crate::types::MessageResponse;

/// OpenAPI documentation for OfficeHub
#[derive(OpenApi)]
#[openapi(
    info(
        title = "OfficeHub API",
        version = "0.1.0",
        description = "Multi-tenant office suite: org units and permissions, calendar, messaging, spreadsheets, phone, code editor and remote desktop brokerage",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        auth_handler::register,
        auth_handler::login,
        auth_handler::logout,
        user_handler::get_current_user,
        user_handler::list_users,
        user_handler::list_deleted_users,
        user_handler::get_user,
        user_handler::update_user,
        user_handler::delete_user,
        user_handler::restore_user,
        unit_handler::list_units,
        unit_handler::create_unit,
        unit_handler::get_unit,
        unit_handler::update_unit,
        unit_handler::delete_unit,
        unit_handler::unit_ancestors,
        unit_handler::unit_subtree,
        unit_handler::list_members,
        unit_handler::add_member,
        unit_handler::remove_member,
        unit_handler::units_of_user,
        unit_handler::list_grants,
        unit_handler::grant_permission,
        unit_handler::revoke_permission,
        unit_handler::list_links,
        unit_handler::create_link,
        unit_handler::delete_link,
        unit_handler::permission_catalogue,
        unit_handler::my_permissions,
        unit_handler::check_permission,
        unit_handler::user_permissions,
        unit_handler::reachable,
        calendar_handler::list_events,
        calendar_handler::create_event,
        calendar_handler::get_event,
        calendar_handler::update_event,
        calendar_handler::delete_event,
        chat_handler::list_conversations,
        chat_handler::start_conversation,
        chat_handler::get_conversation,
        chat_handler::leave_conversation,
        chat_handler::mark_read,
        chat_handler::history,
        chat_handler::send_message,
        chat_handler::edit_message,
        chat_handler::delete_message,
        spreadsheet_handler::list_sheets,
        spreadsheet_handler::create_sheet,
        spreadsheet_handler::get_sheet,
        spreadsheet_handler::rename_sheet,
        spreadsheet_handler::resize_sheet,
        spreadsheet_handler::set_cells,
        spreadsheet_handler::delete_sheet,
        spreadsheet_handler::export_csv,
        phone_handler::dial,
        phone_handler::call_history,
        phone_handler::get_call,
        phone_handler::answer,
        phone_handler::reject,
        phone_handler::hang_up,
        code_handler::languages,
        code_handler::list_documents,
        code_handler::create_document,
        code_handler::get_document,
        code_handler::update_document,
        code_handler::delete_document,
        remote_handler::list_sessions,
        remote_handler::request_session,
        remote_handler::get_session,
        remote_handler::accept_session,
        remote_handler::reject_session,
        remote_handler::close_session,
        remote_handler::send_input,
        remote_handler::send_frame,
        notification_handler::list_notifications,
        notification_handler::mark_read,
        notification_handler::mark_all_read,
        notification_handler::push_socket,
    ),
    components(
        schemas(
            UserRole,
            UserResponse,
            TokenResponse,
            MessageResponse,
            auth_handler::RegisterRequest,
            auth_handler::LoginRequest,
            user_handler::UpdateUserRequest,
            Unit,
            UnitGrant,
            CommunicationLink,
            Permission,
            unit_handler::CreateUnitRequest,
            unit_handler::UpdateUnitRequest,
            unit_handler::AddMemberRequest,
            unit_handler::GrantRequest,
            unit_handler::CreateLinkRequest,
            unit_handler::MyPermissionsResponse,
            unit_handler::PermissionCheckResponse,
            unit_handler::ReachabilityResponse,
            CalendarEvent,
            calendar_handler::CreateEventRequest,
            calendar_handler::UpdateEventRequest,
            Conversation,
            ConversationDetails,
            ChatMessage,
            chat_handler::StartConversationRequest,
            chat_handler::MessageRequest,
            Spreadsheet,
            CellUpdate,
            spreadsheet_handler::CreateSheetRequest,
            spreadsheet_handler::RenameSheetRequest,
            spreadsheet_handler::ResizeSheetRequest,
            spreadsheet_handler::SetCellsRequest,
            CallStatus,
            PhoneCallResponse,
            phone_handler::DialRequest,
            Language,
            CodeDocument,
            code_handler::CreateDocumentRequest,
            code_handler::UpdateDocumentRequest,
            SessionStatus,
            RemoteSession,
            InputEvent,
            MouseButton,
            Frame,
            FrameFormat,
            remote_handler::SessionRequest,
            remote_handler::RelayResponse,
            Notification,
            notification_handler::MarkAllResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login and logout"),
        (name = "Users", description = "User management within a tenant"),
        (name = "Units", description = "Org hierarchy, memberships, grants and communication links"),
        (name = "Permissions", description = "Effective permissions and reachability"),
        (name = "Calendar", description = "Personal events and reminders"),
        (name = "Messaging", description = "Conversations and messages"),
        (name = "Spreadsheets", description = "Grid documents"),
        (name = "Phone", description = "Simulated calls"),
        (name = "Code", description = "Code documents"),
        (name = "Remote desktop", description = "Session brokerage and relay"),
        (name = "Notifications", description = "Inbox and push channel")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "JWT from /api/auth/login; the access_token cookie is accepted too",
                        ))
                        .build(),
                ),
            );
        }
    }
}
