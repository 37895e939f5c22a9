// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

#![cfg(test)]

//! Test assertion to check SQL statements and parameters.

/// Assert that the given SQL and parameters (as returned by
/// [`ExpressionBuilder::to_sql`](crate::sql::ExpressionBuilder::to_sql)) match the expected ones.
///
/// # Usage:
/// ```no_run
/// assert_binding!(actual, expected_stmt, expected_param1, expected_param2, ...);
/// ```
macro_rules! assert_binding {
    ($actual:expr, $expected_stmt:expr $(, $expected_param:expr)* $(,)?) => {{
        let (actual_stmt, actual_params) = $actual;
        assert_eq!(actual_stmt, $expected_stmt);

        #[allow(unused_mut)]
        let mut param_index = 0usize;
        $(
            let expected_param = $expected_param;
            let actual_param = actual_params
                .get(param_index)
                .unwrap_or_else(|| panic!("Missing actual parameter at index {param_index}"));
            assert!(
                $crate::sql::SQLParam::eq(
                    &**actual_param,
                    &expected_param as &dyn $crate::sql::SQLParam
                ),
                "Parameter mismatch at index {param_index}: {actual_param:?} != {expected_param:?}"
            );
            param_index += 1;
        )*
        assert_eq!(actual_params.len(), param_index, "Extra actual parameters");
    }};
}
