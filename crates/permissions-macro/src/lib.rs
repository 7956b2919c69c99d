//! # Permissions Macro
//!
//! Procedural macro for automatic permission checking in Meridian handlers.
//! Supports the `#[with_permission(...)]` attribute, which injects a check
//! against the static role→permission table before the handler body runs.

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input,
    Expr,
    Ident,
    ItemFn,
    Token,
};

/// Arguments for the with_permission macro
#[derive(Debug)]
enum PermissionMode {
    /// All specified permissions must be granted (AND logic)
    All(Vec<Expr>),
    /// At least one specified permission must be granted (OR logic)
    Any(Vec<Expr>),
}

impl Parse for PermissionMode {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        // Check if we have a mode specifier (all/any) followed by =
        if input.peek(Ident) && input.peek2(Token![=]) {
            let ident: Ident = input.parse()?;
            let mode_name = ident.to_string();
            input.parse::<Token![=]>()?;

            match mode_name.as_str() {
                "all" => Ok(Self::All(parse_permission_list(input)?)),
                "any" => Ok(Self::Any(parse_permission_list(input)?)),
                _ => {
                    Err(syn::Error::new(
                        ident.span(),
                        "Expected 'all' or 'any' before '='",
                    ))
                },
            }
        }
        else {
            // No mode specifier, default to 'all'
            Ok(Self::All(parse_permission_list(input)?))
        }
    }
}

/// Parses a comma-separated list of permission expressions.
fn parse_permission_list(input: ParseStream) -> syn::Result<Vec<Expr>> {
    let mut permissions = Vec::new();

    loop {
        if input.is_empty() {
            break;
        }

        let expr: Expr = input.parse()?;
        permissions.push(expr);

        if input.is_empty() {
            break;
        }

        input.parse::<Token![,]>()?;
    }

    if permissions.is_empty() {
        return Err(input.error("at least one permission is required"));
    }

    Ok(permissions)
}

/// Attribute macro for checking permissions on handler functions.
///
/// The check is a lookup in the static role→permission table — no I/O, no
/// await point. The handler must have an `identity: Identity` (or
/// `&Identity`) binding in scope, carrying the caller's role.
///
/// # Modes
///
/// - **all** (default): every listed permission must be granted
/// - **any**: at least one listed permission must be granted
///
/// # Examples
///
/// ```ignore
/// use permissions_macro::with_permission;
/// use auth::rbac::{Permission, TeamAction};
///
/// #[with_permission(Permission::Teams(TeamAction::Create))]
/// pub async fn create_team_handler(
///     state: &AppState,
///     identity: Identity,
///     req: CreateTeamRequest,
/// ) -> Result<Json<ApiResponse<TeamResponse>>> {
///     // only reached when the caller's role grants teams:create
/// }
///
/// #[with_permission(any = Permission::Users(UserAction::Update), Permission::Users(UserAction::Delete))]
/// pub async fn mutate_user_handler(/* ... */) {}
/// ```
#[proc_macro_attribute]
pub fn with_permission(args: TokenStream, input: TokenStream) -> TokenStream {
    let mode = parse_macro_input!(args as PermissionMode);
    let mut input_fn = parse_macro_input!(input as ItemFn);

    let permission_check = match mode {
        PermissionMode::All(permissions) => generate_all_permission_check(&permissions),
        PermissionMode::Any(permissions) => generate_any_permission_check(&permissions),
    };

    let original_block = input_fn.block;
    #[allow(
        clippy::expect_used,
        reason = "Generated code always parses correctly in procedural macro context"
    )]
    let new_block = syn::parse2(quote! {
        {
            #permission_check
            #original_block
        }
    })
    .expect("Failed to parse generated block");

    input_fn.block = Box::new(new_block);

    quote!(#input_fn).into()
}

/// Generate permission checking code for ALL mode (AND logic)
fn generate_all_permission_check(permissions: &[Expr]) -> proc_macro2::TokenStream {
    let permission_exprs = permissions.iter().map(|expr| quote! { #expr });

    quote! {
        // Requires an `identity` binding in scope with a `role` field.
        let required_permissions = [
            #(#permission_exprs),*
        ];

        for perm in &required_permissions {
            if !auth::rbac::has_permission(identity.role, *perm) {
                return Err(error::AppError::forbidden(
                    format!("Permission '{}' is required", perm)
                ));
            }
        }
    }
}

/// Generate permission checking code for ANY mode (OR logic)
fn generate_any_permission_check(permissions: &[Expr]) -> proc_macro2::TokenStream {
    let permission_exprs = permissions.iter().map(|expr| quote! { #expr });

    quote! {
        // Requires an `identity` binding in scope with a `role` field.
        let required_permissions = [
            #(#permission_exprs),*
        ];

        if !auth::rbac::has_any_permission(identity.role, &required_permissions) {
            let wanted = required_permissions
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(error::AppError::forbidden(
                format!("At least one of the required permissions is needed: {}", wanted)
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use syn::parse_str;

    use super::*;

    #[test]
    fn test_parse_all_mode() {
        let input = "Permission::Users(UserAction::Read), Permission::Teams(TeamAction::Create)";
        let mode: PermissionMode = parse_str(input).unwrap();

        match mode {
            PermissionMode::All(perms) => assert_eq!(perms.len(), 2),
            PermissionMode::Any(_) => panic!("Expected All mode"),
        }
    }

    #[test]
    fn test_parse_any_mode() {
        let input = "any = Permission::Users(UserAction::Read), Permission::Teams(TeamAction::Create)";
        let mode: PermissionMode = parse_str(input).unwrap();

        match mode {
            PermissionMode::All(_) => panic!("Expected Any mode"),
            PermissionMode::Any(perms) => assert_eq!(perms.len(), 2),
        }
    }

    #[test]
    fn test_parse_default_all_mode() {
        let input = "Permission::Invitations(InvitationAction::Create)";
        let mode: PermissionMode = parse_str(input).unwrap();

        match mode {
            PermissionMode::All(perms) => assert_eq!(perms.len(), 1),
            PermissionMode::Any(_) => panic!("Expected All mode"),
        }
    }

    #[test]
    fn test_parse_empty_permissions_error() {
        let result: syn::Result<PermissionMode> = parse_str("");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_invalid_mode_name() {
        let result: syn::Result<PermissionMode> =
            parse_str("some = Permission::Users(UserAction::Read)");
        assert!(result.is_err());
    }
}
