//! The fixed set of endpoints, used as the handler type for `auth_router::Router`

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteId {
    Signup,
    ConfirmSignup,
    DeleteSignup,
    SigninPost,
    SigninGet,
    SigninDelete,
    Refresh,
    ForgotPost,
    ForgotPut,
    ListUsers,
    GetUser,
    AccessInfo,
    PrivateRead,
    PrivateWrite,
    PrivateDelete,
}

pub fn build() -> auth_router::Router<RouteId> {
    use http::Method;

    let mut router = auth_router::Router::new();
    router.add(Method::POST, "/auth/signup", RouteId::Signup);
    router.add(Method::PUT, "/auth/signup/:username", RouteId::ConfirmSignup);
    router.add(Method::DELETE, "/auth/signup/:username", RouteId::DeleteSignup);
    router.add(Method::POST, "/auth/signin/:username", RouteId::SigninPost);
    router.add(Method::GET, "/auth/signin/:username", RouteId::SigninGet);
    router.add(Method::DELETE, "/auth/signin/:username", RouteId::SigninDelete);
    router.add(Method::PUT, "/auth/refresh/:token", RouteId::Refresh);
    router.add(Method::POST, "/auth/forgot/:username", RouteId::ForgotPost);
    router.add(Method::PUT, "/auth/forgot/:username", RouteId::ForgotPut);
    router.add(Method::GET, "/auth/info", RouteId::ListUsers);
    router.add(Method::GET, "/auth/info/:username", RouteId::GetUser);
    router.add(Method::GET, "/auth/access/info", RouteId::AccessInfo);
    router.add(Method::GET, "/private/*", RouteId::PrivateRead);
    router.add(Method::POST, "/private/*", RouteId::PrivateWrite);
    router.add(Method::DELETE, "/private/*", RouteId::PrivateDelete);
    router
}
